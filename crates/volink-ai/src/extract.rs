use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

use crate::matcher::{CampaignMatch, CampaignSummary};

/// 最多返回的推荐条数
pub const MAX_MATCHES: usize = 5;

/// 模型回复中的单条推荐（字段名与 prompt 约定一致）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMatch {
    campaign_id: String,
    match_score: f64,
    reason: String,
    #[serde(default)]
    highlights: Vec<String>,
}

/// 从模型回复中截取 JSON 数组并映射回活动清单。
///
/// 模型偶尔会在数组前后加说明文字或 markdown 围栏，这里只取
/// 第一个 `[` 到最后一个 `]` 之间的内容。未知活动 ID 整条丢弃，
/// 分数收敛到 0-100，结果截断为前 [`MAX_MATCHES`] 条。截取或
/// 解析失败时整个调用失败，不产生部分结果。
pub fn extract_matches(
    content: &str,
    campaigns: &[CampaignSummary],
) -> Result<Vec<CampaignMatch>> {
    let json = slice_json_array(content)?;
    let raw: Vec<RawMatch> =
        serde_json::from_str(json).context("AI reply is not a valid match array")?;

    let by_id: HashMap<&str, &CampaignSummary> =
        campaigns.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut matches = Vec::new();
    for item in raw {
        let Some(campaign) = by_id.get(item.campaign_id.as_str()) else {
            tracing::warn!(
                campaign_id = %item.campaign_id,
                "AI suggested an unknown campaign id, dropping"
            );
            continue;
        };

        matches.push(CampaignMatch {
            campaign: (*campaign).clone(),
            match_score: item.match_score.clamp(0.0, 100.0).round() as u8,
            reason: item.reason,
            highlights: item.highlights,
        });

        if matches.len() == MAX_MATCHES {
            break;
        }
    }

    Ok(matches)
}

/// 取第一个 `[` 到最后一个 `]` 的切片
fn slice_json_array(content: &str) -> Result<&str> {
    match (content.find('['), content.rfind(']')) {
        (Some(start), Some(end)) if start < end => Ok(&content[start..=end]),
        _ => bail!("AI reply contains no JSON array"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summaries(n: usize) -> Vec<CampaignSummary> {
        (1..=n)
            .map(|i| CampaignSummary {
                id: format!("c-{i}"),
                title: format!("Campaign {i}"),
                category: "Community".to_string(),
                location: Some("Porto".to_string()),
                description: Some("Helping hands wanted.".to_string()),
                ngo_name: format!("NGO {i}"),
            })
            .collect()
    }

    fn raw_entry(id: &str, score: f64) -> String {
        format!(
            r#"{{"campaignId": "{id}", "matchScore": {score}, "reason": "fits", "highlights": ["a", "b"]}}"#
        )
    }

    #[test]
    fn test_extract_enriches_matches_from_the_campaign_list() {
        let campaigns = summaries(3);
        let reply = format!("[{}, {}]", raw_entry("c-2", 91.0), raw_entry("c-1", 60.0));

        let matches = extract_matches(&reply, &campaigns).unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].campaign.title, "Campaign 2");
        assert_eq!(matches[0].campaign.ngo_name, "NGO 2");
        assert_eq!(matches[0].match_score, 91);
        assert_eq!(matches[0].reason, "fits");
        assert_eq!(matches[0].highlights, vec!["a", "b"]);
    }

    #[test]
    fn test_extract_tolerates_prose_and_markdown_fences() {
        let campaigns = summaries(1);
        let reply = format!(
            "Here are your matches:\n```json\n[{}]\n```\nGood luck!",
            raw_entry("c-1", 75.0)
        );

        let matches = extract_matches(&reply, &campaigns).unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].campaign.id, "c-1");
    }

    #[test]
    fn test_unknown_campaign_ids_are_dropped() {
        let campaigns = summaries(2);
        let reply = format!(
            "[{}, {}, {}]",
            raw_entry("c-1", 80.0),
            raw_entry("c-999", 95.0),
            raw_entry("c-2", 70.0)
        );

        let matches = extract_matches(&reply, &campaigns).unwrap();

        let ids: Vec<&str> = matches.iter().map(|m| m.campaign.id.as_str()).collect();
        assert_eq!(ids, vec!["c-1", "c-2"]);
    }

    #[test]
    fn test_scores_clamp_to_the_percent_range() {
        let campaigns = summaries(2);
        let reply = format!("[{}, {}]", raw_entry("c-1", 150.0), raw_entry("c-2", -3.0));

        let matches = extract_matches(&reply, &campaigns).unwrap();

        assert_eq!(matches[0].match_score, 100);
        assert_eq!(matches[1].match_score, 0);
    }

    #[test]
    fn test_result_truncates_to_five_matches() {
        let campaigns = summaries(7);
        let entries: Vec<String> = (1..=7).map(|i| raw_entry(&format!("c-{i}"), 90.0)).collect();
        let reply = format!("[{}]", entries.join(", "));

        let matches = extract_matches(&reply, &campaigns).unwrap();

        assert_eq!(matches.len(), MAX_MATCHES);
        assert_eq!(matches[4].campaign.id, "c-5");
    }

    #[test]
    fn test_missing_highlights_default_to_empty() {
        let campaigns = summaries(1);
        let reply = r#"[{"campaignId": "c-1", "matchScore": 42, "reason": "ok"}]"#;

        let matches = extract_matches(reply, &campaigns).unwrap();

        assert!(matches[0].highlights.is_empty());
    }

    #[test]
    fn test_reply_without_an_array_is_an_error() {
        let campaigns = summaries(1);

        assert!(extract_matches("I could not find any matches.", &campaigns).is_err());
        assert!(extract_matches("]backwards[", &campaigns).is_err());
    }

    #[test]
    fn test_malformed_json_fails_the_whole_call() {
        let campaigns = summaries(1);
        let reply = r#"[{"campaignId": "c-1", "matchScore": }]"#;

        assert!(extract_matches(reply, &campaigns).is_err());
    }
}
