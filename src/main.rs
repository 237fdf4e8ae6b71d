use clap::Parser;
use timecard_generator::{
    CliArgs, LoggingConfig, SummaryFormat, TimecardConfig, TimecardError, init_logging, run,
};

fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let _guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    let config = TimecardConfig::from_args(cli)?;

    // Fail fast before touching the source or the lookup backend
    config.validate()?;

    let summary = match run(&config) {
        Ok(summary) => summary,
        Err(error) => {
            if let Some(failure) = error.downcast_ref::<TimecardError>() {
                let code = failure.code();
                tracing::error!(code = %code, category = code.category(), "{failure}");
            }
            return Err(error);
        }
    };

    match config.summary {
        SummaryFormat::Text => println!("{summary}"),
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}
