use crate::matcher::MatchInput;

/// 构建匹配 prompt：志愿者画像 + 编号活动清单 + 输出约定
pub fn build_match_prompt(input: &MatchInput) -> String {
    MATCH_PROMPT
        .replace("{{PROFILE}}", &format_profile(input))
        .replace("{{CAMPAIGNS}}", &format_campaigns(input))
}

fn format_profile(input: &MatchInput) -> String {
    let skills = if input.skills.is_empty() {
        "not specified".to_string()
    } else {
        input.skills.join(", ")
    };

    format!(
        "- Interests: {}\n- Skills: {}\n- Availability: {}\n- Location: {}",
        or_unspecified(&input.interests),
        skills,
        or_unspecified(&input.availability),
        or_unspecified(&input.location),
    )
}

/// 把全部候选活动格式化为编号清单（不做条数截断，截断发生在结果侧）
fn format_campaigns(input: &MatchInput) -> String {
    let mut output = String::new();

    for (idx, campaign) in input.campaigns.iter().enumerate() {
        output.push_str(&format!(
            "{}. id={} | {} | category: {} | location: {} | by {}\n   {}\n",
            idx + 1,
            campaign.id,
            campaign.title,
            campaign.category,
            campaign.location.as_deref().unwrap_or("anywhere"),
            campaign.ngo_name,
            campaign.description.as_deref().unwrap_or("(no description)"),
        ));
    }

    output
}

fn or_unspecified(value: &str) -> &str {
    if value.trim().is_empty() {
        "not specified"
    } else {
        value
    }
}

const MATCH_PROMPT: &str = r#"You are a coordinator at a volunteer matching platform. A volunteer is looking for campaigns to join.

Volunteer profile:
{{PROFILE}}

Open campaigns:
{{CAMPAIGNS}}

Select the campaigns that fit this volunteer best and answer with a JSON array only, containing at most 5 objects shaped like:
[{"campaignId": "...", "matchScore": 87, "reason": "...", "highlights": ["...", "..."]}]

Rules:
- campaignId must be copied verbatim from the list above.
- matchScore is an integer from 0 to 100, higher is better.
- reason explains the fit in at most 50 words.
- highlights lists 2-3 short phrases naming the strongest overlaps.
- Order the array from best match to weakest.
- Do not wrap the array in markdown fences and do not add commentary.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::CampaignSummary;

    fn sample_input() -> MatchInput {
        MatchInput {
            interests: "environment".to_string(),
            skills: vec!["gardening".to_string(), "logistics".to_string()],
            availability: "weekends".to_string(),
            location: "Lisbon".to_string(),
            campaigns: vec![
                CampaignSummary {
                    id: "c-100".to_string(),
                    title: "River Cleanup".to_string(),
                    category: "Environment".to_string(),
                    location: Some("Lisbon".to_string()),
                    description: Some("Monthly riverbank cleanup.".to_string()),
                    ngo_name: "Green Tejo".to_string(),
                },
                CampaignSummary {
                    id: "c-200".to_string(),
                    title: "Food Drive".to_string(),
                    category: "Community".to_string(),
                    location: None,
                    description: None,
                    ngo_name: "City Pantry".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_prompt_numbers_every_campaign_with_verbatim_ids() {
        let prompt = build_match_prompt(&sample_input());

        assert!(prompt.contains("1. id=c-100 | River Cleanup"));
        assert!(prompt.contains("2. id=c-200 | Food Drive"));
        assert!(prompt.contains("by Green Tejo"));
    }

    #[test]
    fn test_prompt_fills_gaps_with_placeholders() {
        let mut input = sample_input();
        input.interests = "  ".to_string();
        input.skills.clear();

        let prompt = build_match_prompt(&input);

        assert!(prompt.contains("- Interests: not specified"));
        assert!(prompt.contains("- Skills: not specified"));
        assert!(prompt.contains("location: anywhere"));
        assert!(prompt.contains("(no description)"));
    }

    #[test]
    fn test_prompt_states_the_output_contract() {
        let prompt = build_match_prompt(&sample_input());

        assert!(prompt.contains("at most 5 objects"));
        assert!(prompt.contains("\"campaignId\""));
        assert!(prompt.contains("matchScore is an integer from 0 to 100"));
    }
}
