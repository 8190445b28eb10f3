//! Command-line arguments.
//!
//! Everything except the one-shot migration switch comes from the
//! environment; see `config`.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "huddle-service")]
#[command(version)]
#[command(about = "Room membership and WHIP/WHEP signaling gateway", long_about = None)]
pub struct Args {
    /// Apply pending database migrations before serving
    #[arg(long, action)]
    pub migrate: bool,
}
