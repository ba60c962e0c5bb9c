use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::fs;

#[derive(Clone, Deserialize)]
pub struct Config {
    pub discord_token: String,
    pub owner_id: Option<u64>,
    pub admin_ids: Vec<u64>,
    pub prefix: String,
    pub database_url: String,
    pub replies_path: String,
    pub status_message: String,
    pub embed_color: u32,
    pub dev_guild_id: Option<u64>,
    pub register_commands: bool,
}

/// Colour used for plain "normal" embeds.
pub const DEFAULT_EMBED_COLOR: u32 = 0x0066ff;

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            owner_id: env::var("OWNER_ID").ok().and_then(|id| id.parse().ok()),
            admin_ids: Self::load_admins()?,
            prefix: env::var("PREFIX").unwrap_or_else(|_| "rt!".to_string()),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "data/rt.db".to_string()),
            replies_path: env::var("REPLIES_PATH")
                .unwrap_or_else(|_| "data/replies.json".to_string()),
            status_message: env::var("STATUS_MESSAGE")
                .unwrap_or_else(|_| "rt!help".to_string()),
            embed_color: env::var("EMBED_COLOR")
                .ok()
                .and_then(|c| u32::from_str_radix(c.trim_start_matches("0x"), 16).ok())
                .unwrap_or(DEFAULT_EMBED_COLOR),
            dev_guild_id: env::var("DEV_GUILD_ID").ok().and_then(|id| id.parse().ok()),
            register_commands: env::var("REGISTER_COMMANDS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        })
    }

    /// Admin ids come from `admins.toml`, falling back to the `ADMIN_IDS` env var.
    pub fn load_admins() -> anyhow::Result<Vec<u64>> {
        if let Ok(content) = fs::read_to_string("admins.toml") {
            #[derive(Deserialize)]
            struct AdminsWrapper {
                admins: Vec<u64>,
            }
            let wrapper = toml::from_str::<AdminsWrapper>(&content)
                .map_err(|e| anyhow::anyhow!("admins.toml is malformed: {}", e))?;
            return Ok(wrapper.admins);
        }

        Ok(Self::parse_id_list(&env::var("ADMIN_IDS").unwrap_or_default()))
    }

    fn parse_id_list(raw: &str) -> Vec<u64> {
        raw.split(',')
            .filter_map(|id| id.trim().parse().ok())
            .collect()
    }

    pub fn is_admin(&self, user_id: u64) -> bool {
        self.owner_id == Some(user_id) || self.admin_ids.contains(&user_id)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("owner_id", &self.owner_id)
            .field("admin_ids", &self.admin_ids)
            .field("prefix", &self.prefix)
            .field("database_url", &self.database_url)
            .field("replies_path", &self.replies_path)
            .field("status_message", &self.status_message)
            .field("embed_color", &format!("{:#08x}", self.embed_color))
            .field("dev_guild_id", &self.dev_guild_id)
            .field("register_commands", &self.register_commands)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        discord_token: "test".to_string(),
        owner_id: Some(1),
        admin_ids: vec![2],
        prefix: "rt!".to_string(),
        database_url: ":memory:".to_string(),
        replies_path: "data/replies.json".to_string(),
        status_message: "test".to_string(),
        embed_color: DEFAULT_EMBED_COLOR,
        dev_guild_id: None,
        register_commands: false,
    }
}
