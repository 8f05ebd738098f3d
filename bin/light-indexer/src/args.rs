use std::path::PathBuf;

use argh::FromArgs;

/// Default location of the denylist file.
const DEFAULT_DENYLIST_PATH: &str = "deny.jsonlines";

fn default_denylist_path() -> PathBuf {
    PathBuf::from(DEFAULT_DENYLIST_PATH)
}

#[derive(Debug, Clone, FromArgs)]
#[argh(description = "BRC-20 light indexer")]
pub(crate) struct Args {
    #[argh(option, short = 'c', description = "path to the TOML configuration file")]
    pub config: PathBuf,

    #[argh(
        option,
        default = "default_denylist_path()",
        description = "path to the denylist file (default: deny.jsonlines)"
    )]
    pub deny: PathBuf,
}
