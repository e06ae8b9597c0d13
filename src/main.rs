mod cli;

use anyhow::Result;
use termtap::logger;
use tracing::{error, info};

fn main() -> Result<()> {
    logger::init()?;
    info!(args = ?std::env::args().collect::<Vec<_>>(), "termtap start");

    match cli::run() {
        Ok(result) => {
            info!("termtap finished successfully");
            Ok(result)
        }
        Err(err) => {
            error!(error = ?err, "termtap failed");
            Err(err)
        }
    }
}
