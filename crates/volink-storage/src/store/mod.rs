use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use std::path::Path;

pub mod application;
pub mod campaign;
pub mod notification;
pub mod otp;
pub mod profile;
pub mod registration;

// ---- 公开 Row 类型（从各子模块重新导出）----
pub use application::{ApplicationFilter, ApplicationRow, NewApplication};
pub use campaign::{CampaignFilter, CampaignRow, CampaignUpdate, NewCampaign};
pub use notification::{NewNotification, NotificationRow};
pub use otp::OtpCodeRow;
pub use profile::{NewProfile, ProfileFilter, ProfileRow, ProfileUpdate};
pub use registration::{NewRegistration, RegistrationFilter, RegistrationRow};

/// 业务数据库（volink.db）的统一访问层。
///
/// 所有方法均为 `async fn`，底层使用 SeaORM + SQLite。
pub struct HubStore {
    pub(crate) db: DatabaseConnection,
}

impl HubStore {
    /// 连接并初始化业务数据库。
    ///
    /// - `db_url`：完整的数据库连接 URL，由调用方（服务器配置）提供。
    ///   SQLite 示例：`sqlite://data/volink.db?mode=rwc`
    /// - `data_dir`：本地数据目录；SQLite 文件所在目录需要预先存在。
    ///
    /// 自动运行 `sea-orm-migration` 迁移，确保 Schema 最新。
    pub async fn new(db_url: &str, data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db = Database::connect(db_url).await?;

        // WAL 模式仅对 SQLite 有效
        if db_url.starts_with("sqlite://") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        // 运行所有待执行迁移
        Migrator::up(&db, None).await?;

        tracing::info!(db_url = %db_url, "Initialized hub store (SeaORM)");

        Ok(Self { db })
    }

    /// 返回底层数据库连接引用（供子模块使用）。
    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
