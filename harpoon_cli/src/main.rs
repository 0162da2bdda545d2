//! HARPOON logic-locking CLI
//!
//! Entry point for the `harpoon` command-line tool. Locks a gate-level design,
//! writes the locked netlist, controller, wrapper and key, and optionally
//! synthesizes the merged result with yosys.

#[global_allocator]
/// Global allocator using jemalloc.
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

mod args;

use clap::Parser;
use harpoon_lock::Locker;
use tracing::info;

use args::Args;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let locker = Locker::new(args.to_config())?;

    info!("Locking {} in {}", args.top, args.netlist.display());
    let paths = locker.run(&args.netlist, &args.top)?;

    println!("locked design: {}", paths.locked.display());
    println!("controller:    {}", paths.controller.display());
    println!("top module:    {}", paths.top.display());
    println!("key:           {}", paths.key.display());
    if let Some(synth) = &paths.synthesized {
        println!("synthesized:   {}", synth.display());
    }

    Ok(())
}
