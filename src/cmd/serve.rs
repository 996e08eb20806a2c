use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::error::AppResult;
use crate::infra::dev_server;
use crate::infra::store::TicketStore;

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:10024")]
    pub addr: SocketAddr,
    /// JSON file with `tickets` and `employees` to start from.
    #[arg(long)]
    pub seed: Option<PathBuf>,
}

pub async fn run(args: ServeArgs) -> AppResult<()> {
    let store = match &args.seed {
        Some(path) => {
            info!(path = %path.display(), "loading seed data");
            TicketStore::from_seed_file(path)?
        }
        None => TicketStore::sample(),
    };
    dev_server::serve(args.addr, store).await
}
