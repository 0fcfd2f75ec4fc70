use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    ExitCode::from(deploy_contracts::start(std::env::args()).await)
}
