//! Parsing of the planner agent's answer.

use serde::Deserialize;

use super::model::ScenarioOption;
use crate::error::AgentCallError;

/// Number of options a planning round must produce.
pub const SCENARIO_OPTION_COUNT: usize = 3;

#[derive(Deserialize)]
struct PlannerPayload {
    scenarios: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawOption {
    title: String,
    summary: String,
    #[serde(default)]
    focus: String,
    agent_instructions: String,
    #[serde(default)]
    opponent_name: Option<String>,
}

/// Extracts exactly [`SCENARIO_OPTION_COUNT`] options from the planner reply.
///
/// The reply is expected to be a JSON object `{"scenarios": [...]}`, possibly
/// wrapped in prose or a code fence. Entries missing a required field or with a
/// blank title/instructions are skipped; surplus entries are dropped. Fewer
/// than three usable entries is a malformed reply.
pub fn parse_scenario_options(raw: &str) -> Result<Vec<ScenarioOption>, AgentCallError> {
    let candidate = json_object_slice(raw)
        .ok_or_else(|| AgentCallError::Malformed("planner reply contains no JSON object".into()))?;

    let payload: PlannerPayload = serde_json::from_str(candidate)
        .map_err(|e| AgentCallError::Malformed(format!("planner JSON invalid: {e}")))?;

    let options: Vec<ScenarioOption> = payload
        .scenarios
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawOption>(value).ok())
        .filter(|raw| !raw.title.trim().is_empty() && !raw.agent_instructions.trim().is_empty())
        .map(|raw| ScenarioOption {
            title: raw.title.trim().to_string(),
            summary: raw.summary.trim().to_string(),
            focus: raw.focus.trim().to_string(),
            agent_instructions: raw.agent_instructions.trim().to_string(),
            opponent_name: raw
                .opponent_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
        })
        .take(SCENARIO_OPTION_COUNT)
        .collect();

    if options.len() < SCENARIO_OPTION_COUNT {
        return Err(AgentCallError::Malformed(format!(
            "planner produced {} usable scenario(s), expected {}",
            options.len(),
            SCENARIO_OPTION_COUNT
        )));
    }

    Ok(options)
}

/// Slice from the first `{` to the last `}`.
pub(crate) fn json_object_slice(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option_json(title: &str) -> String {
        format!(
            r#"{{"id":"x","title":"{title}","summary":"s","focus":"f","agent_instructions":"push hard","opponent_name":"Reidar"}}"#
        )
    }

    fn reply(titles: &[&str]) -> String {
        let items: Vec<String> = titles.iter().map(|t| option_json(t)).collect();
        format!(r#"{{"scenarios":[{}]}}"#, items.join(","))
    }

    #[test]
    fn test_parses_three_options() {
        let options = parse_scenario_options(&reply(&["A", "B", "C"])).unwrap();
        assert_eq!(options.len(), 3);
        assert_eq!(options[1].title, "B");
        assert_eq!(options[0].opponent_name.as_deref(), Some("Reidar"));
    }

    #[test]
    fn test_tolerates_prose_and_code_fences() {
        let raw = format!("Here you go:\n```json\n{}\n```\nGood luck!", reply(&["A", "B", "C"]));
        assert_eq!(parse_scenario_options(&raw).unwrap().len(), 3);
    }

    #[test]
    fn test_truncates_surplus_options() {
        let options = parse_scenario_options(&reply(&["A", "B", "C", "D"])).unwrap();
        assert_eq!(options.len(), 3);
        assert_eq!(options[2].title, "C");
    }

    #[test]
    fn test_fewer_than_three_is_malformed() {
        let err = parse_scenario_options(&reply(&["A", "B"])).unwrap_err();
        assert!(matches!(err, AgentCallError::Malformed(_)));
    }

    #[test]
    fn test_incomplete_entries_do_not_count() {
        let raw = format!(
            r#"{{"scenarios":[{},{},{{"title":"no instructions","summary":"s"}}]}}"#,
            option_json("A"),
            option_json("B")
        );
        assert!(parse_scenario_options(&raw).is_err());
    }

    #[test]
    fn test_non_json_is_malformed() {
        assert!(matches!(
            parse_scenario_options("I cannot help with that."),
            Err(AgentCallError::Malformed(_))
        ));
    }
}
