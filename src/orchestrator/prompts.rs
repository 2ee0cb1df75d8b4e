// orchestrator/prompts.rs — Instructions sent to the direct providers

/// System + user halves of a chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Single-turn rendering for providers without a system role
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

pub fn grammar(text: &str) -> Prompt {
    Prompt {
        system: "You are a careful copy editor. Rewrite the user's text in its original language \
            and return ONLY a JSON object with these string fields:\n\
            - \"clean_up\": the text with spelling, grammar and punctuation fixed, wording otherwise unchanged\n\
            - \"better_flow\": a natural, fluent rewrite that keeps the meaning and tone\n\
            - \"concise\": the shortest rewrite that keeps every fact\n\
            - \"notes\": one or two short remarks about the main issues, or an empty string\n\
            Do not add content the user did not write."
            .to_string(),
        user: format!("Text:\n{}", text),
    }
}

pub fn translation(text: &str, target_language: &str) -> Prompt {
    Prompt {
        system: format!(
            "You are a professional translator. Translate the user's text into the language \
            with code \"{}\" and return ONLY a JSON object with these string fields:\n\
            - \"translation\": the translated text, preserving line breaks and formatting\n\
            - \"detected_source_language\": the language code of the original text\n\
            - \"notes\": brief remarks on ambiguous terms, or an empty string\n\
            If the text is already in the target language, return it unchanged.",
            target_language
        ),
        user: format!("Text:\n{}", text),
    }
}
