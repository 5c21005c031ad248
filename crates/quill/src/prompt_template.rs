use include_dir::{include_dir, Dir};
use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

/// The prompt templates shipped with the crate
static PROMPTS: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/prompts");

/// Render a template string; every variable it uses must be present in `context_data`
pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let context = Context::from_serialize(context_data)?;
    Tera::one_off(template, &context, false)
}

/// Render one of the embedded templates, e.g. `researcher.md`
pub fn load_prompt_file<T: Serialize>(
    template_file: &str,
    context_data: &T,
) -> Result<String, TeraError> {
    let template_content = PROMPTS
        .get_file(template_file)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| TeraError::msg(format!("Unknown prompt template: {}", template_file)))?;
    load_prompt(template_content, context_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tool::Tool;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_load_prompt_loops_over_tools() {
        let template = "{% for tool in tools %}[{{ tool.name }}]{% endfor %}";
        let mut context = HashMap::new();
        context.insert(
            "tools",
            vec![
                Tool::new("a__one", "", json!({})),
                Tool::new("b__two", "", json!({})),
            ],
        );

        assert_eq!(load_prompt(template, &context).unwrap(), "[a__one][b__two]");
    }

    #[test]
    fn test_load_prompt_missing_variable() {
        let context: HashMap<String, String> = HashMap::new();
        assert!(load_prompt("Topic: {{ topic }}", &context).is_err());
    }

    #[test]
    fn test_embedded_templates_render() {
        let mut context = HashMap::new();
        context.insert("tools", Vec::<Tool>::new());
        for (file, opening) in [
            ("analyzer.md", "You are the analyzer"),
            ("writer.md", "You are the writer"),
        ] {
            let prompt = load_prompt_file(file, &context).unwrap();
            assert!(prompt.starts_with(opening), "{file} starts with {prompt:?}");
        }
    }

    #[test]
    fn test_load_prompt_file_missing_file() {
        let context: HashMap<String, String> = HashMap::new();
        let result = load_prompt_file("non_existent_template.md", &context);
        assert!(result.is_err());
    }

    #[test]
    fn test_researcher_prompt_lists_tools() {
        let tools = vec![
            Tool::new("web__search", "Search the web", json!({"type": "object"})),
            Tool::new("papers__lookup", "Find papers", json!({"type": "object"})),
        ];
        let mut context = HashMap::new();
        context.insert("tools".to_string(), tools);

        let result = load_prompt_file("researcher.md", &context).unwrap();
        assert!(result.contains("- web__search: Search the web"));
        assert!(result.contains("- papers__lookup: Find papers"));
        assert!(!result.contains("No tools are available"));
    }

    #[test]
    fn test_researcher_prompt_without_tools() {
        let mut context = HashMap::new();
        context.insert("tools".to_string(), Vec::<Tool>::new());

        let result = load_prompt_file("researcher.md", &context).unwrap();
        assert!(result.contains("No tools are available"));
    }
}
