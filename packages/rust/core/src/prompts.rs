//! Prompt templates for the two completion steps of a conversation turn.

use coursewise_catalog::CompetencyIndex;
use coursewise_shared::{CourseRecord, CoursewiseError, Result};

/// Marks the boundaries of user text inside prompts, and of reasoning steps
/// in the reply.
pub const DELIMITER: &str = "####";

/// System message every new conversation starts with.
pub const GREETING: &str = "You are a helpful assistant for course recommendations.";

/// Reply given when moderation flags the input or the generated answer.
pub const REFUSAL: &str =
    "Sorry, I can't help with that request. Please ask about our courses instead.";

/// Wrap user text in the delimiter pair.
pub fn delimited(user_text: &str) -> String {
    format!("{DELIMITER}{user_text}{DELIMITER}")
}

/// System prompt asking the model to pick competencies and courses.
pub fn identify_system_prompt(index: &CompetencyIndex) -> Result<String> {
    let listing = serde_json::to_string(index)
        .map_err(|e| CoursewiseError::parse(format!("failed to serialize competency index: {e}")))?;

    Ok(format!(
        "You will be provided with customer service queries. \
The customer service query will be enclosed in the pair of {DELIMITER}.

Decide if the query is relevant to any specific courses in the JSON object below, \
where each key is a `competency` and the value is a list of `course_name`.

If there are any relevant course(s), output a list of JSON objects with:
1) competency
2) course_name

{listing}

If the query is generic or does not mention specific competencies, output a JSON list \
containing one object per competency, each with the competency name and one or two sample \
course names, to provide general recommendations.

If no courses or competencies match, output an empty list.

Ensure your response contains only the list of objects or an empty list, \
without any enclosing tags or delimiters."
    ))
}

/// System prompt asking the model to answer using the matched courses.
pub fn reply_system_prompt(courses: &[CourseRecord]) -> Result<String> {
    let details = serde_json::to_string(courses)
        .map_err(|e| CoursewiseError::parse(format!("failed to serialize course details: {e}")))?;

    Ok(format!(
        "Follow these steps to answer the customer queries.
The customer query will be delimited with a pair {DELIMITER}.

Step 1:{DELIMITER} If the user is asking about course(s), identify the relevant course(s) \
from the following list:
{details}

Step 2:{DELIMITER} Use the course information to answer the query. \
Only use facts from the course details provided. Be informative and detailed.

Step 3:{DELIMITER} Answer the customer in a friendly and professional tone. \
Include pricing, delivery mode, duration, learning outcomes, and start/end dates. \
Use natural, clear language that aids decision-making.

Use the following format:
Step 1:{DELIMITER} <step 1 reasoning>
Step 2:{DELIMITER} <step 2 reasoning>
Step 3:{DELIMITER} <step 3 response to customer>

Include {DELIMITER} between steps."
    ))
}

/// The customer-facing part of a stepped reply: whatever follows the last
/// delimiter, trimmed.
pub fn final_step(answer: &str) -> &str {
    answer.rsplit(DELIMITER).next().unwrap_or(answer).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_step_takes_text_after_last_delimiter() {
        let answer = "Step 1:#### thinking\nStep 2:#### more\nStep 3:####  Try Treasury 101! ";
        assert_eq!(final_step(answer), "Try Treasury 101!");
    }

    #[test]
    fn final_step_without_delimiter_is_whole_answer() {
        assert_eq!(final_step("  plain reply \n"), "plain reply");
    }

    #[test]
    fn identify_prompt_lists_competencies_in_order() {
        let mut index = CompetencyIndex::default();
        index.insert("Risk Management", "Credit Risk 101");
        index.insert("Data Analytics", "Python for Finance");
        let prompt = identify_system_prompt(&index).unwrap();
        assert!(prompt.contains(
            r#"{"Risk Management":["Credit Risk 101"],"Data Analytics":["Python for Finance"]}"#
        ));
        assert!(prompt.contains("enclosed in the pair of ####"));
    }

    #[test]
    fn reply_prompt_embeds_course_records() {
        let record = CourseRecord::from_pairs([("Course Title", "Credit Risk 101"), ("Cost", "$500")]);
        let prompt = reply_system_prompt(&[record]).unwrap();
        assert!(prompt.contains(r#"[{"Cost":"$500","Course Title":"Credit Risk 101"}]"#));
    }

    #[test]
    fn delimited_wraps_both_sides() {
        assert_eq!(delimited("hi"), "####hi####");
    }
}
