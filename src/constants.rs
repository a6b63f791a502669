pub mod auth {

    pub const SESSION_TOKEN_LIFETIME_HOURS: i64 = 24;

    pub const RESET_CODE_TTL_MINUTES: i64 = 10;

    /// Codes are drawn uniformly from `0..=RESET_CODE_MAX` and zero padded.
    pub const RESET_CODE_MAX: u32 = 999_999;

    pub const RESET_CODE_DIGITS: usize = 6;

    /// Signing secret the legacy service fell back to when none was configured.
    pub const LEGACY_DEFAULT_JWT_SECRET: &str = "fonokids-super-secret-key-2024";
}

pub mod env {

    pub const JWT_SECRET: &str = "FONOKIDS_JWT_SECRET";

    pub const DATABASE_URL: &str = "FONOKIDS_DATABASE_URL";

    pub const SMTP_PASSWORD: &str = "FONOKIDS_SMTP_PASSWORD";
}

pub mod mail {

    pub const RESET_SUBJECT: &str = "Código de Recuperación - FonoKids";

    pub const SEND_TIMEOUT_SECS: u64 = 10;
}
