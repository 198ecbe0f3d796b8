use churn_predict::config::Config;
use churn_predict::form_controller::{ControllerSettings, FormController, ResultsNavigator, SubmitStatus};
use churn_predict::core::models::{Field, PredictionOutcome};
use churn_predict::integrations::prediction_client::PredictionClient;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "churn-predict", about = "Bank customer churn prediction client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a customer profile and request a churn prediction.
    Predict(PredictArgs),
    /// Check that the prediction service is up.
    Health,
}

/// Values are passed through as typed; validation reports anything off.
#[derive(Args)]
struct PredictArgs {
    #[arg(long, default_value = "")]
    credit_score: String,
    /// 1 = male, 0 = female
    #[arg(long, default_value = "")]
    gender: String,
    #[arg(long, default_value = "")]
    age: String,
    #[arg(long, default_value = "")]
    tenure: String,
    #[arg(long, default_value = "")]
    balance: String,
    #[arg(long, default_value = "")]
    products_number: String,
    /// 1 = has a credit card
    #[arg(long, default_value = "")]
    credit_card: String,
    /// 1 = active member
    #[arg(long, default_value = "")]
    active_member: String,
    #[arg(long, default_value = "")]
    estimated_salary: String,
    /// France, Spain or Germany
    #[arg(long, default_value = "")]
    country: String,
    /// Overrides CHURN_TIMEOUT_MS for this request.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Skip the warm-up probe.
    #[arg(long)]
    no_warm_up: bool,
}

impl PredictArgs {
    fn fields(&self) -> [(Field, &str); 10] {
        [
            (Field::CreditScore, self.credit_score.as_str()),
            (Field::Gender, self.gender.as_str()),
            (Field::Age, self.age.as_str()),
            (Field::Tenure, self.tenure.as_str()),
            (Field::Balance, self.balance.as_str()),
            (Field::ProductsNumber, self.products_number.as_str()),
            (Field::CreditCard, self.credit_card.as_str()),
            (Field::ActiveMember, self.active_member.as_str()),
            (Field::EstimatedSalary, self.estimated_salary.as_str()),
            (Field::Country, self.country.as_str()),
        ]
    }
}

/// Plain-text results view.
struct TerminalResults;

impl ResultsNavigator for TerminalResults {
    fn show_results(&self, outcome: &PredictionOutcome) {
        match outcome {
            PredictionOutcome::Success(result) => {
                let risk = result.risk_level();
                println!("Prediction:        {}", result.classification);
                println!(
                    "Churn probability: {:.2}%",
                    result.churn_probability * 100.0
                );
                println!("Threshold:         {}", result.threshold);
                println!("Risk assessment:   {}", risk.description());
            }
            PredictionOutcome::Failure(failure) => {
                println!("Prediction failed: {}", failure.message);
                println!("Fix the problem above and run the command again to retry.");
            }
        }
    }
}

/// Main entry point: initializes tracing and configuration, then runs the
/// requested command.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "churn_predict=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let client = PredictionClient::new(&config)?;

    match cli.command {
        Command::Health => {
            if client.check_health().await {
                println!("✓ Prediction service at {} is running", client.base_url());
                Ok(())
            } else {
                anyhow::bail!("Prediction service at {} is not responding", client.base_url())
            }
        }
        Command::Predict(args) => {
            let mut settings = ControllerSettings::from(&config);
            if let Some(ms) = args.timeout_ms {
                settings.timeout = Duration::from_millis(ms);
            }
            if args.no_warm_up {
                settings.warm_up = false;
            }

            let controller = FormController::new(client, Arc::new(TerminalResults), settings);
            for (field, value) in args.fields() {
                controller.on_field_change(field, value);
            }

            match controller.submit().await {
                SubmitStatus::Completed(PredictionOutcome::Success(_)) => Ok(()),
                SubmitStatus::Completed(PredictionOutcome::Failure(failure)) => {
                    Err(anyhow::anyhow!(failure))
                }
                SubmitStatus::Invalid(errors) => {
                    for (field, message) in &errors {
                        eprintln!(
                            "  {} (--{}): {}",
                            field.label(),
                            field.as_str().replace('_', "-"),
                            message
                        );
                    }
                    anyhow::bail!("{} field(s) need attention", errors.len())
                }
                SubmitStatus::Busy | SubmitStatus::Superseded => {
                    anyhow::bail!("Prediction was not completed")
                }
            }
        }
    }
}
