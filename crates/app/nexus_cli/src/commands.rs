use log::info;
use nexus_client::{ClientConfig, FetchOutcome, NexusClient, Session, Trigger};
use nexus_core::models::health::HealthEntry;
use nexus_core::validation::{MeasurementForm, RegistrationForm};

use crate::cli::{Credentials, EntriesCommand, RegisterArgs};
use crate::{Error, Result};

pub async fn register(config: &ClientConfig, args: RegisterArgs) -> Result<()> {
    let client = NexusClient::new(config)?;
    let form = RegistrationForm {
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        password: args.password,
        confirm_password: args.confirm_password,
    };
    client.sessions.register(&form).await?;
    println!("Registered {}. You can now log in.", form.email.trim());
    Ok(())
}

pub async fn entries(config: &ClientConfig, credentials: &Credentials, action: EntriesCommand) -> Result<()> {
    // Check a new entry before asking the backend for anything.
    let new_entry = match &action {
        EntriesCommand::Add(fields) => {
            let mut form = MeasurementForm::default();
            fields.apply_to(&mut form);
            let errors = form.validate();
            if !errors.is_empty() {
                return Err(Error::Validation(errors));
            }
            Some(form)
        }
        _ => None,
    };

    let client = NexusClient::new(config)?;
    let session = sign_in(&client, credentials).await?;
    let mut list = client.record_list();

    let result = async {
        list.refresh(&client.sessions, &session).await?;
        match action {
            EntriesCommand::List => {
                if list.entries().is_empty() {
                    println!("No health entries yet.");
                }
                for entry in list.entries() {
                    print_entry(entry);
                }
            }
            EntriesCommand::Add(_) => {
                let form = new_entry.unwrap_or_default();
                let entry = list.submit(&client.sessions, &session, &form).await?;
                print_entry(&entry);
            }
            EntriesCommand::Edit { id, fields } => {
                let mut form = list.begin_edit(id)?;
                fields.apply_to(&mut form);
                let entry = list.submit(&client.sessions, &session, &form).await?;
                print_entry(&entry);
            }
            EntriesCommand::Delete { id } => {
                list.remove(&client.sessions, &session, id).await?;
                println!("Deleted entry {id}.");
            }
        }
        Ok::<_, Error>(())
    }
    .await;

    client.sessions.logout();
    result
}

pub async fn insights(config: &ClientConfig, credentials: &Credentials) -> Result<()> {
    let client = NexusClient::new(config)?;
    let session = sign_in(&client, credentials).await?;
    let feed = client.insight_feed();

    let outcome = feed
        .fetch(Trigger::InitialLoad, &client.sessions, &session)
        .await;
    feed.close();
    client.sessions.logout();

    match outcome {
        FetchOutcome::Applied(insight) => {
            println!("{}", insight.text);
            Ok(())
        }
        FetchOutcome::Failed(err) => Err(err.into()),
        FetchOutcome::Busy | FetchOutcome::Discarded => {
            Err(Error::Custom("Insight request was superseded".into()))
        }
    }
}

async fn sign_in(client: &NexusClient, credentials: &Credentials) -> Result<Session> {
    let session = client
        .sessions
        .login(&credentials.email, &credentials.password)
        .await?;
    info!("Logged in as {}", credentials.email.trim());
    Ok(session)
}

fn print_entry(entry: &HealthEntry) {
    let recorded = entry
        .timestamp
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into());
    println!(
        "#{:<5} {recorded:<16}  weight {:>6.1}  bp {:>7}  glucose {:>6.1}",
        entry.id, entry.weight, entry.blood_pressure.to_string(), entry.glucose
    );
}
