use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Terminal logging for the binaries; `verbose` lowers the level to debug.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let config = ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto)?;
    Ok(())
}
