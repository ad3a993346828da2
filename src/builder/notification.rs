//! Notification configuration to and from `protos::NotificationConfig`.

use serde_json::{json, Map, Value};

use crate::enums::ProtoEnum;
use crate::error::ProviderError;
use crate::fields::Fields;
use crate::proto::streamdal::{
    notification_config, notification_email, notification_pager_duty::Urgency,
    NotificationConfig, NotificationEmail, NotificationEmailSes, NotificationEmailSmtp,
    NotificationPagerDuty, NotificationSlack, NotificationType,
};

/// SMTP port used when none is configured.
pub const DEFAULT_SMTP_PORT: i32 = 587;

/// Attributes holding nested, possibly secret, configuration.
pub const CONFIG_BLOCKS: [&str; 3] = ["slack", "email", "pagerduty"];

/// Build a notification config from resource configuration or state.
pub fn build_notification(config: &Value) -> Result<NotificationConfig, ProviderError> {
    let fields = Fields::root(config)?;
    let kind: NotificationType = fields.enum_value("type")?;
    let context = format!("notification type '{}'", kind.name());

    let payload = match kind {
        NotificationType::Slack => {
            let block = fields.required_block("slack", &context)?;
            let slack = block.fields()?;
            notification_config::Config::Slack(NotificationSlack {
                bot_token: slack.str("bot_token")?,
                channel: slack.str("channel")?,
            })
        },
        NotificationType::Pagerduty => {
            let block = fields.required_block("pagerduty", &context)?;
            let pd = block.fields()?;
            let urgency = pd.enum_or("urgency", Urgency::Low)?;
            notification_config::Config::Pagerduty(NotificationPagerDuty {
                token: pd.str("token")?,
                email: pd.str("email")?,
                service_id: pd.str("service_id")?,
                urgency: urgency as i32,
            })
        },
        NotificationType::Email => {
            let block = fields.required_block("email", &context)?;
            notification_config::Config::Email(build_email(&block.fields()?)?)
        },
        NotificationType::Unset => {
            return Err(ProviderError::InvalidAttribute {
                attribute: "type".to_string(),
                message: "notification type 'unset' is not supported".to_string(),
            })
        },
    };

    Ok(NotificationConfig {
        id: fields.opt_str("id")?.filter(|id| !id.is_empty()),
        name: fields.str("name")?,
        r#type: kind as i32,
        config: Some(payload),
    })
}

fn build_email(email: &Fields<'_>) -> Result<NotificationEmail, ProviderError> {
    let kind: notification_email::Type = email.enum_value("type")?;
    let context = format!("email type '{}'", kind.name());

    let recipients = email.strings("recipients")?;
    if recipients.is_empty() {
        return Err(ProviderError::InvalidAttribute {
            attribute: email.path_of("recipients"),
            message: "at least one recipient is required".to_string(),
        });
    }

    let config = match kind {
        notification_email::Type::Smtp => {
            let block = email.required_block("smtp", &context)?;
            let smtp = block.fields()?;
            notification_email::Config::Smtp(NotificationEmailSmtp {
                host: smtp.str("host")?,
                port: smtp.int32_or("port", DEFAULT_SMTP_PORT)?,
                user: smtp.str("user")?,
                password: smtp.str("password")?,
                use_tls: smtp.bool_or("use_tls", true)?,
            })
        },
        notification_email::Type::Ses => {
            let block = email.required_block("ses", &context)?;
            let ses = block.fields()?;
            notification_email::Config::Ses(NotificationEmailSes {
                ses_region: ses.str("ses_region")?,
                ses_access_key_id: ses.str("ses_access_key")?,
                ses_secret_access_key: ses.str("ses_secret_access_key")?,
            })
        },
        notification_email::Type::Unset => {
            return Err(ProviderError::InvalidAttribute {
                attribute: email.path_of("type"),
                message: "email type 'unset' is not supported".to_string(),
            })
        },
    };

    Ok(NotificationEmail {
        r#type: kind as i32,
        recipients,
        from_address: email.str("from_address")?,
        config: Some(config),
    })
}

/// Canonical state for a notification config.
pub fn notification_to_state(config: &NotificationConfig) -> Value {
    let mut out = Map::new();
    out.insert("id".into(), json!(config.id.clone().unwrap_or_default()));
    out.insert("name".into(), json!(config.name));
    out.insert("type".into(), json!(config.r#type().name()));

    match &config.config {
        Some(notification_config::Config::Slack(slack)) => {
            out.insert(
                "slack".into(),
                json!({"channel": slack.channel, "bot_token": slack.bot_token}),
            );
        },
        Some(notification_config::Config::Pagerduty(pd)) => {
            out.insert(
                "pagerduty".into(),
                json!({
                    "token": pd.token,
                    "email": pd.email,
                    "service_id": pd.service_id,
                    "urgency": pd.urgency().name(),
                }),
            );
        },
        Some(notification_config::Config::Email(email)) => {
            out.insert("email".into(), email_to_state(email));
        },
        None => {},
    }

    Value::Object(out)
}

fn email_to_state(email: &NotificationEmail) -> Value {
    let mut out = Map::new();
    out.insert("type".into(), json!(email.r#type().name()));
    out.insert("recipients".into(), json!(email.recipients));
    out.insert("from_address".into(), json!(email.from_address));

    match &email.config {
        Some(notification_email::Config::Smtp(smtp)) => {
            out.insert(
                "smtp".into(),
                json!({
                    "host": smtp.host,
                    "port": smtp.port,
                    "user": smtp.user,
                    "password": smtp.password,
                    "use_tls": smtp.use_tls,
                }),
            );
        },
        Some(notification_email::Config::Ses(ses)) => {
            out.insert(
                "ses".into(),
                json!({
                    "ses_region": ses.ses_region,
                    "ses_access_key": ses.ses_access_key_id,
                    "ses_secret_access_key": ses.ses_secret_access_key,
                }),
            );
        },
        None => {},
    }

    Value::Object(out)
}
