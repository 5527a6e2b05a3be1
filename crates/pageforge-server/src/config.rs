use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub pages_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub edit_token: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            pages_dir: env::var("PAGES_DIR")
                .unwrap_or_else(|_| "data/pages".to_string())
                .into(),
            static_dir: env::var("STATIC_DIR").ok().map(PathBuf::from),
            edit_token: env::var("EDIT_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }
}
