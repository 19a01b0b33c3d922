use serde::{Deserialize, Serialize};

/// Account type chosen at sign-up. Role is always derived from the profile's
/// `is_ngo` flag, never stored separately.
///
/// # Examples
///
/// ```
/// use volink_common::types::AccountType;
///
/// let kind: AccountType = "ngo".parse().unwrap();
/// assert_eq!(kind, AccountType::Ngo);
/// assert_eq!(kind.to_string(), "ngo");
/// assert!(kind.is_ngo());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Volunteer,
    Ngo,
}

impl AccountType {
    pub fn is_ngo(self) -> bool {
        matches!(self, AccountType::Ngo)
    }

    /// 从 `is_ngo` 标志还原账号类型
    pub fn from_is_ngo(is_ngo: bool) -> Self {
        if is_ngo {
            AccountType::Ngo
        } else {
            AccountType::Volunteer
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountType::Volunteer => write!(f, "volunteer"),
            AccountType::Ngo => write!(f, "ngo"),
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "volunteer" => Ok(AccountType::Volunteer),
            "ngo" => Ok(AccountType::Ngo),
            _ => Err(format!("unknown account type: {s}")),
        }
    }
}

/// Review status of a campaign application or volunteer registration.
///
/// The set is closed: every stored value is one of these three, lowercase.
/// Any state may move to any other state; moving back to `Pending` is the
/// reviewer's "reset" action.
///
/// # Examples
///
/// ```
/// use volink_common::types::ApplicationStatus;
///
/// let status: ApplicationStatus = "approved".parse().unwrap();
/// assert_eq!(status, ApplicationStatus::Approved);
/// assert_eq!(status.to_string(), "approved");
/// assert_eq!(status.transition_label(ApplicationStatus::Pending), "reset");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// Name of the transition from `self` to `to`, for audit logging.
    /// Every pair is legal; the label records which review action happened.
    pub fn transition_label(self, to: ApplicationStatus) -> &'static str {
        match (self, to) {
            (a, b) if a == b => "unchanged",
            (_, ApplicationStatus::Approved) => "approve",
            (_, ApplicationStatus::Rejected) => "reject",
            (_, ApplicationStatus::Pending) => "reset",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationStatus::Pending => write!(f, "pending"),
            ApplicationStatus::Approved => write!(f, "approved"),
            ApplicationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(format!("unknown application status: {s}")),
        }
    }
}

/// Split a comma-separated skills field into trimmed, non-empty entries.
///
/// Application forms submit skills as free text; storage and matching want a
/// list. Order is preserved, entries are not deduplicated.
///
/// # Examples
///
/// ```
/// use volink_common::types::parse_skills;
///
/// let skills = parse_skills("Teaching, First Aid,  ");
/// assert_eq!(skills, vec!["Teaching".to_string(), "First Aid".to_string()]);
/// assert!(parse_skills("").is_empty());
/// ```
pub fn parse_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// User & Auth types

/// 注册请求
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// 邮箱（必填，作为登录标识）
    pub email: String,
    /// 明文密码（必填，至少 8 位，服务端 bcrypt 存储）
    pub password: String,
    /// 账号类型：volunteer 或 ngo（必填）
    pub account_type: AccountType,
    /// 志愿者姓名（volunteer 注册时必填）
    pub full_name: Option<String>,
    /// 机构名称（ngo 注册时必填）
    pub ngo_name: Option<String>,
}

/// 登录请求
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// 邮箱（必填）
    pub email: String,
    /// 明文密码（必填）
    pub password: String,
}

/// 会话响应（注册 / 登录 / OTP 验证共用）
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AuthResponse {
    /// JWT Access Token
    pub access_token: String,
    /// Token 有效期（秒）
    pub expires_in: u64,
    /// 账号对应的档案 ID
    pub profile_id: String,
    /// 派生角色：volunteer 或 ngo
    pub account_type: AccountType,
}

/// 发送 OTP 验证码请求
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SendOtpRequest {
    /// 接收验证码的邮箱（必填）
    pub email: String,
}

/// 校验 OTP 验证码请求
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VerifyOtpRequest {
    /// 邮箱（必填）
    pub email: String,
    /// 6 位数字验证码（必填）
    pub otp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_labels_cover_review_actions() {
        use ApplicationStatus::*;
        assert_eq!(Pending.transition_label(Approved), "approve");
        assert_eq!(Pending.transition_label(Rejected), "reject");
        assert_eq!(Approved.transition_label(Pending), "reset");
        assert_eq!(Rejected.transition_label(Pending), "reset");
        assert_eq!(Approved.transition_label(Rejected), "reject");
        assert_eq!(Approved.transition_label(Approved), "unchanged");
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in [
            ApplicationStatus::Pending,
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
        ] {
            let parsed: ApplicationStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("archived".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_parse_skills_drops_blank_entries() {
        assert_eq!(
            parse_skills("Teaching, First Aid,  "),
            vec!["Teaching", "First Aid"]
        );
        assert_eq!(parse_skills(" , ,"), Vec::<String>::new());
        assert_eq!(parse_skills("solo"), vec!["solo"]);
    }

    #[test]
    fn test_account_type_derivation() {
        assert_eq!(AccountType::from_is_ngo(true), AccountType::Ngo);
        assert_eq!(AccountType::from_is_ngo(false), AccountType::Volunteer);
        assert!(!AccountType::Volunteer.is_ngo());
    }
}
