use crate::cli::run;

mod cli;

fn main() -> anyhow::Result<()> {
    run()
}
