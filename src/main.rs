use log::debug;
use shellax::shell::Shell;
use shellax::utils::config::Config;
use shellax::utils::log::init_logger;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::new();
    init_logger(&config);
    debug!("config loaded from {}", config.config_dir.display());

    let mut shell = Shell::new(&config)?;
    shell.run()?;
    println!();
    Ok(())
}
