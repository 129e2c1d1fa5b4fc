mod output;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use mms_core::constants::STORAGE_DIR_ENV;
use mms_core::{storage_dir_from_env_value, CoreConfig, LifecycleEngine, TreatmentStatus};
use output::{emit, lines, ConsoleSink};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mms")]
#[command(about = "Medical-service accounts: patients, treatments, bills and notifications")]
struct Cli {
    /// Directory holding the collection files [env: MMS_STORAGE_DIR] [default: storage]
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new patient
    RegisterPatient {
        name: String,
        phone: String,
        email: String,
        password: String,
    },
    /// Register a new clinician
    RegisterClinician {
        name: String,
        phone: String,
        email: String,
        password: String,
        specialization: String,
        #[arg(long, default_value_t = 10)]
        max_patients: u32,
    },
    /// Register a new admin
    RegisterAdmin {
        name: String,
        phone: String,
        email: String,
        password: String,
        department: String,
    },
    /// Check an email and password against every account
    Login { email: String, password: String },
    /// Mark a patient as registered so they can book treatments
    UpgradePatient { patient_id: String },
    /// Flag a patient for review
    FlagPatient { patient_id: String },
    /// Opt a patient in to or out of promotional notifications
    SetPromotions {
        patient_id: String,
        #[arg(action = ArgAction::Set)]
        opted_in: bool,
    },
    /// Flip a patient's promotional opt-in
    TogglePromotions { patient_id: String },
    /// Book a treatment for a registered patient
    BookTreatment {
        patient_id: String,
        treatment_type_id: String,
    },
    /// Assign a clinician to a treatment
    AssignClinician {
        treatment_id: String,
        clinician_id: String,
    },
    /// Set a treatment's status (New, Assessed, "Bill Generated", Completed, Paid)
    UpdateStatus {
        treatment_id: String,
        status: TreatmentStatus,
    },
    /// Replace the clinician notes on a treatment
    RecordNotes { treatment_id: String, notes: String },
    /// Raise a bill for a treatment at its current price
    GenerateBill { treatment_id: String },
    /// Mark a bill as paid
    RecordPayment { bill_id: String },
    /// Add a treatment type
    AddTreatmentType {
        name: String,
        #[arg(allow_negative_numbers = true)]
        price: f64,
    },
    /// Remove a treatment type
    RemoveTreatmentType { treatment_type_id: String },
    /// Send a notification to a patient
    SendNotification {
        patient_id: String,
        message: String,
        /// Withheld from patients who opted out of promotions
        #[arg(long)]
        promotional: bool,
    },
    /// List patients
    ListPatients,
    /// List clinicians
    ListClinicians,
    /// List admins
    ListAdmins,
    /// List treatment types
    ListTreatmentTypes,
    /// List treatments
    ListTreatments {
        #[arg(long, conflicts_with = "clinician")]
        patient: Option<String>,
        #[arg(long)]
        clinician: Option<String>,
    },
    /// List bills
    ListBills {
        #[arg(long)]
        patient: Option<String>,
    },
    /// List notifications
    ListNotifications {
        #[arg(long)]
        patient: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("mms=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let storage_dir = cli
        .storage_dir
        .unwrap_or_else(|| storage_dir_from_env_value(std::env::var(STORAGE_DIR_ENV).ok()));
    let cfg = Arc::new(CoreConfig::new(storage_dir)?);
    tracing::debug!(storage_dir = %cfg.storage_dir().display(), "using storage directory");

    let mut engine = LifecycleEngine::open(cfg.clone())
        .with_context(|| format!("opening storage at {}", cfg.storage_dir().display()))?;
    if !cli.json {
        engine = engine.with_sink(ConsoleSink);
    }

    run(&mut engine, cli.command, cli.json)
}

fn run(engine: &mut LifecycleEngine, command: Commands, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::RegisterPatient {
            name,
            phone,
            email,
            password,
        } => {
            let patient = engine.register_patient(&name, &phone, &email, &password)?;
            emit(json, &patient, |p| format!("Registered patient {}", output::patient(p)))
        }
        Commands::RegisterClinician {
            name,
            phone,
            email,
            password,
            specialization,
            max_patients,
        } => {
            let clinician = engine.register_clinician(
                &name,
                &phone,
                &email,
                &password,
                &specialization,
                max_patients,
            )?;
            emit(json, &clinician, |c| {
                format!("Registered clinician {}", output::clinician(c))
            })
        }
        Commands::RegisterAdmin {
            name,
            phone,
            email,
            password,
            department,
        } => {
            let admin = engine.register_admin(&name, &phone, &email, &password, &department)?;
            emit(json, &admin, |a| format!("Registered admin {}", output::admin(a)))
        }
        Commands::Login { email, password } => {
            let user = engine.authenticate(&email, &password)?;
            emit(json, &user, output::user)
        }
        Commands::UpgradePatient { patient_id } => {
            let patient = engine.upgrade_patient(&patient_id)?;
            emit(json, &patient, output::patient)
        }
        Commands::FlagPatient { patient_id } => {
            let patient = engine.flag_patient(&patient_id)?;
            emit(json, &patient, output::patient)
        }
        Commands::SetPromotions {
            patient_id,
            opted_in,
        } => {
            let patient = engine.set_promotions_opt_in(&patient_id, opted_in)?;
            emit(json, &patient, output::patient)
        }
        Commands::TogglePromotions { patient_id } => {
            let patient = engine.toggle_promotions(&patient_id)?;
            emit(json, &patient, output::patient)
        }
        Commands::BookTreatment {
            patient_id,
            treatment_type_id,
        } => {
            let treatment = engine.book_treatment(&patient_id, &treatment_type_id)?;
            emit(json, &treatment, |t| format!("Booked {}", output::treatment(t)))
        }
        Commands::AssignClinician {
            treatment_id,
            clinician_id,
        } => {
            let treatment = engine.assign_clinician(&treatment_id, &clinician_id)?;
            emit(json, &treatment, output::treatment)
        }
        Commands::UpdateStatus {
            treatment_id,
            status,
        } => {
            let treatment = engine.update_treatment_status(&treatment_id, status)?;
            emit(json, &treatment, output::treatment)
        }
        Commands::RecordNotes {
            treatment_id,
            notes,
        } => {
            let treatment = engine.record_treatment_notes(&treatment_id, &notes)?;
            emit(json, &treatment, output::treatment)
        }
        Commands::GenerateBill { treatment_id } => {
            let bill = engine.generate_bill(&treatment_id)?;
            emit(json, &bill, |b| format!("Generated {}", output::bill(b)))
        }
        Commands::RecordPayment { bill_id } => {
            let bill = engine.record_payment(&bill_id)?;
            emit(json, &bill, output::bill)
        }
        Commands::AddTreatmentType { name, price } => {
            let treatment_type = engine.add_treatment_type(&name, price)?;
            emit(json, &treatment_type, |t| {
                format!("Added {}", output::treatment_type(t))
            })
        }
        Commands::RemoveTreatmentType { treatment_type_id } => {
            let removed = engine.remove_treatment_type(&treatment_type_id)?;
            emit(json, &removed, |t| {
                format!("Removed {}", output::treatment_type(t))
            })
        }
        Commands::SendNotification {
            patient_id,
            message,
            promotional,
        } => {
            let delivery = engine.send_notification(&patient_id, &message, promotional)?;
            emit(json, &delivery, output::delivery)
        }
        Commands::ListPatients => {
            let patients = engine.registry().patients();
            emit(json, patients.as_slice(), |ps| {
                lines(ps, "No patients found.", output::patient)
            })
        }
        Commands::ListClinicians => {
            let clinicians = engine.registry().clinicians();
            emit(json, clinicians.as_slice(), |cs| {
                lines(cs, "No clinicians found.", output::clinician)
            })
        }
        Commands::ListAdmins => {
            let admins = engine.registry().admins();
            emit(json, admins.as_slice(), |a| {
                lines(a, "No admins found.", output::admin)
            })
        }
        Commands::ListTreatmentTypes => {
            let types = engine.registry().treatment_types();
            emit(json, types.as_slice(), |ts| {
                lines(ts, "No treatment types found.", output::treatment_type)
            })
        }
        Commands::ListTreatments { patient, clinician } => {
            let registry = engine.registry();
            let treatments = match (patient, clinician) {
                (Some(patient_id), _) => registry.patient_treatments(&patient_id),
                (None, Some(clinician_id)) => registry.clinician_treatments(&clinician_id),
                (None, None) => registry.treatments(),
            };
            emit(json, treatments.as_slice(), |ts| {
                lines(ts, "No treatments found.", output::treatment)
            })
        }
        Commands::ListBills { patient } => {
            let registry = engine.registry();
            let bills = match patient {
                Some(patient_id) => registry.patient_bills(&patient_id),
                None => registry.bills(),
            };
            emit(json, bills.as_slice(), |bs| {
                lines(bs, "No bills found.", output::bill)
            })
        }
        Commands::ListNotifications { patient } => {
            let registry = engine.registry();
            let notifications = match patient {
                Some(patient_id) => registry.patient_notifications(&patient_id),
                None => registry.notifications(),
            };
            emit(json, notifications.as_slice(), |ns| {
                lines(ns, "No notifications found.", output::notification)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn status_argument_accepts_labels() {
        let cli = Cli::try_parse_from(["mms", "update-status", "TRE-1", "Bill Generated"]).unwrap();
        match cli.command {
            Commands::UpdateStatus { status, .. } => {
                assert_eq!(status, TreatmentStatus::BillGenerated)
            }
            _ => panic!("expected update-status"),
        }
        assert!(Cli::try_parse_from(["mms", "update-status", "TRE-1", "Cancelled"]).is_err());
    }

    #[test]
    fn commands_run_against_storage_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = Arc::new(CoreConfig::new(temp_dir.path().to_path_buf()).unwrap());
        let mut engine = LifecycleEngine::open(cfg).unwrap();

        run(&mut engine, Commands::UpgradePatient { patient_id: "PAT001".into() }, true).unwrap();
        run(
            &mut engine,
            Commands::BookTreatment {
                patient_id: "PAT001".into(),
                treatment_type_id: "TRT001".into(),
            },
            true,
        )
        .unwrap();

        assert_eq!(engine.registry().patient_treatments("PAT001").len(), 1);
        let missing_bill = Commands::RecordPayment {
            bill_id: "BILL-x".into(),
        };
        assert!(run(&mut engine, missing_bill, true).is_err());
    }
}
