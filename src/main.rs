use registry_migrator::cli::{Args, Runner};
use registry_migrator::logging;
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse_args();
    logging::init(args.verbose, args.quiet);

    let fail_on_error = args.fail_on_error;
    match Runner::new(args).run().await {
        Ok(report) if fail_on_error && report.has_failures() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
