use ptmscan_cli::input::{command, Input};
use ptmscan_cli::runner::Runner;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("PTMSCAN_LOG", "error,ptmscan=info"))
        .init();

    let matches = command().get_matches();

    let input = Input::from_arguments(matches)?;

    let runner = input.build().and_then(Runner::new)?;

    let tel = runner.run()?;
    tel.report();

    Ok(())
}
