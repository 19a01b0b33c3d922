use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 按依赖顺序建表
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
PRAGMA journal_mode=WAL;

CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT,
    is_ngo INTEGER NOT NULL DEFAULT 0,
    full_name TEXT,
    ngo_name TEXT,
    ngo_description TEXT,
    ngo_website TEXT,
    avatar_url TEXT,
    bio TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_profiles_email ON profiles(email);
CREATE INDEX IF NOT EXISTS idx_profiles_is_ngo ON profiles(is_ngo);

CREATE TABLE IF NOT EXISTS campaigns (
    id TEXT PRIMARY KEY NOT NULL,
    ngo_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    location TEXT,
    date TEXT,
    goal TEXT,
    category TEXT NOT NULL DEFAULT 'Community',
    image_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_campaigns_ngo_id ON campaigns(ngo_id);
CREATE INDEX IF NOT EXISTS idx_campaigns_category ON campaigns(category);
CREATE INDEX IF NOT EXISTS idx_campaigns_created_at ON campaigns(created_at DESC);

CREATE TABLE IF NOT EXISTS campaign_applications (
    id TEXT PRIMARY KEY NOT NULL,
    campaign_id TEXT NOT NULL,
    volunteer_id TEXT NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT,
    interest TEXT,
    skills TEXT NOT NULL DEFAULT '[]',
    experience TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_applications_campaign ON campaign_applications(campaign_id);
CREATE INDEX IF NOT EXISTS idx_applications_volunteer ON campaign_applications(volunteer_id);
CREATE INDEX IF NOT EXISTS idx_applications_status ON campaign_applications(status);
CREATE INDEX IF NOT EXISTS idx_applications_pair ON campaign_applications(campaign_id, volunteer_id);

CREATE TABLE IF NOT EXISTS volunteer_registrations (
    id TEXT PRIMARY KEY NOT NULL,
    volunteer_id TEXT NOT NULL,
    ngo_id TEXT NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT,
    interest TEXT,
    availability TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_registrations_volunteer ON volunteer_registrations(volunteer_id);
CREATE INDEX IF NOT EXISTS idx_registrations_ngo ON volunteer_registrations(ngo_id);
CREATE INDEX IF NOT EXISTS idx_registrations_pair ON volunteer_registrations(ngo_id, volunteer_id);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY NOT NULL,
    recipient_id TEXT NOT NULL,
    sender_id TEXT,
    notification_type TEXT NOT NULL,
    content TEXT NOT NULL,
    metadata TEXT,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id);
CREATE INDEX IF NOT EXISTS idx_notifications_created_at ON notifications(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_notifications_is_read ON notifications(recipient_id, is_read);

CREATE TABLE IF NOT EXISTS otp_codes (
    id TEXT PRIMARY KEY NOT NULL,
    email TEXT NOT NULL,
    otp_code TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    used INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_otp_codes_email ON otp_codes(email);
CREATE INDEX IF NOT EXISTS idx_otp_codes_expires_at ON otp_codes(expires_at);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS otp_codes;
DROP TABLE IF EXISTS notifications;
DROP TABLE IF EXISTS volunteer_registrations;
DROP TABLE IF EXISTS campaign_applications;
DROP TABLE IF EXISTS campaigns;
DROP TABLE IF EXISTS profiles;
";
