use clap::{Args, Parser, Subcommand};
use nexus_core::models::health::EntryId;
use nexus_core::validation::{BloodPressureInput, MeasurementForm};

#[derive(Parser, Debug)]
#[command(name = "nexus", about = "Nexus health-tracking client")]
pub struct Cli {
    /// Backend base URL (defaults to NEXUS_API_URL or http://localhost:8000).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the version.
    Version,

    /// Create an account. Log in afterwards with the same email.
    Register(RegisterArgs),

    /// List, add, edit or delete health entries.
    Entries {
        #[command(flatten)]
        credentials: Credentials,

        #[command(subcommand)]
        action: EntriesCommand,
    },

    /// Show AI insights derived from the stored entries.
    Insights {
        #[command(flatten)]
        credentials: Credentials,
    },
}

/// Every authenticated command logs in first; nothing is persisted.
#[derive(Args, Debug)]
pub struct Credentials {
    #[arg(long, env = "NEXUS_EMAIL")]
    pub email: String,

    #[arg(long, env = "NEXUS_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub password: String,

    #[arg(long)]
    pub confirm_password: String,
}

#[derive(Subcommand, Debug)]
pub enum EntriesCommand {
    List,

    Add(MeasurementArgs),

    /// Edit an entry; fields not given keep their stored values.
    Edit {
        id: EntryId,

        #[command(flatten)]
        fields: MeasurementArgs,
    },

    Delete { id: EntryId },
}

#[derive(Args, Debug, Default)]
pub struct MeasurementArgs {
    #[arg(long)]
    pub weight: Option<String>,

    /// Blood pressure as "systolic/diastolic", e.g. 120/80.
    #[arg(long, conflicts_with_all = ["systolic", "diastolic"])]
    pub bp: Option<String>,

    #[arg(long, requires = "diastolic")]
    pub systolic: Option<u16>,

    #[arg(long, requires = "systolic")]
    pub diastolic: Option<u16>,

    #[arg(long)]
    pub glucose: Option<String>,
}

impl MeasurementArgs {
    /// Overwrite the fields of `form` that were given on the command line.
    pub fn apply_to(&self, form: &mut MeasurementForm) {
        if let Some(weight) = &self.weight {
            form.weight = weight.clone();
        }
        if let Some(bp) = &self.bp {
            form.blood_pressure = BloodPressureInput::Text(bp.clone());
        }
        if let (Some(systolic), Some(diastolic)) = (self.systolic, self.diastolic) {
            form.blood_pressure = BloodPressureInput::Sliders {
                systolic,
                diastolic,
            };
        }
        if let Some(glucose) = &self.glucose {
            form.glucose = glucose.clone();
        }
    }
}
