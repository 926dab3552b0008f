pub const PROMPT_TEMPLATE: &str = r#"Problem (Q): "{problem}"
A possible answer of Q is A'. First verify if A' is correct, then think step by step to find the answer.
Candidate Answer (A'): {candidate}

Please emit only valid JSON conforming to the schema provided:
{ "is_a_prime_correct": boolean, "verification_critique": string, "newly_generated_answer": string }
"#;

/// Substitutes `{name}` placeholders in a single pass. Braces that do not form
/// a known placeholder are copied through, and substituted text is never
/// rescanned.
fn render_template_with_placeholders<'a, F>(template: &str, resolve: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut rendered = String::with_capacity(template.len());
    let mut cursor = template;

    while let Some(start) = cursor.find('{') {
        rendered.push_str(&cursor[..start]);
        let after_open = &cursor[start + 1..];
        let replacement = after_open.find('}').and_then(|close| {
            resolve(&after_open[..close]).map(|value| (value, close))
        });
        match replacement {
            Some((value, close)) => {
                rendered.push_str(value);
                cursor = &after_open[close + 1..];
            }
            None => {
                rendered.push('{');
                cursor = after_open;
            }
        }
    }

    rendered.push_str(cursor);
    rendered
}

pub fn render_verification_prompt(problem: &str, candidate: &str) -> String {
    render_template_with_placeholders(PROMPT_TEMPLATE, |token| match token {
        "problem" => Some(problem),
        "candidate" => Some(candidate),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_references_problem_and_candidate() {
        let prompt = render_verification_prompt("What is 2+2?", "4");
        assert!(prompt.contains("What is 2+2?"));
        assert!(prompt.contains("Candidate Answer (A'): 4"));
        assert!(prompt.starts_with("Problem (Q): \"What is 2+2?\"\n"));
    }

    #[test]
    fn json_schema_braces_survive_rendering() {
        let prompt = render_verification_prompt("q", "a");
        assert!(prompt.contains(
            "{ \"is_a_prime_correct\": boolean, \"verification_critique\": string, \"newly_generated_answer\": string }"
        ));
    }

    #[test]
    fn values_are_inserted_verbatim_without_rescanning() {
        let prompt = render_verification_prompt("say \"{candidate}\" \\n", "{problem}");
        assert!(prompt.contains("Problem (Q): \"say \"{candidate}\" \\n\""));
        assert!(prompt.contains("Candidate Answer (A'): {problem}"));
    }
}
