use crate::config::Config;
use crate::error::AppError;

/// The terminal's block files use an undocumented layout; rather than guess
/// at one, this subcommand refuses cleanly.
pub fn run(_config: &Config, _csv_only: bool, _db_only: bool) {
    let err = AppError::Unsupported(
        "block/sector relation extraction is not implemented; the vendor block file layout is undocumented"
            .to_string(),
    );
    eprintln!("❌ Error: {}", err);
    std::process::exit(1);
}
