pub const ANALYSIS_PROMPT: &str = "Analyze this image and describe the person in detail: their \
                                   pose, facial expression, clothing, and any distinctive \
                                   features. Be specific.";

const BASE_PROMPT: &str = r#"Transform this image into the viral "241543903" meme (Heads in Freezers meme).

The person in the image should appear to be sticking their head inside a refrigerator/freezer, surrounded by frozen food items, ice, and frost.

Create a realistic composite that looks like they're actually inside a freezer with their head among frozen vegetables, ice cream, and other frozen goods.

Make it humorous and true to the original meme aesthetic. Ensure the lighting and perspective match a typical refrigerator interior view.

CRITICAL REQUIREMENTS:
1. Person's head should be inside a refrigerator/freezer
2. Surround with frozen food: ice cream containers, frozen vegetables (peas, corn, etc.), ice cubes
3. Add frost and ice effects
4. Cool white/blue lighting typical of refrigerator interiors
5. Realistic composite - should look like they're actually in the freezer
6. Maintain recognizable features from the original person
7. Humorous and meme-worthy aesthetic
8. High quality, photorealistic result"#;

const VISUAL_REQUIREMENTS: &str = r#"CRITICAL VISUAL REQUIREMENTS:
1. The person should appear to be sticking their head inside a refrigerator/freezer
2. Surround them with frozen food items: ice cream, frozen vegetables, ice, frost
3. Create a realistic composite that looks like they're actually inside a freezer
4. Their head should be among frozen goods (frozen peas, ice cream containers, etc.)
5. Add frost and ice effects around the edges
6. Maintain the person's recognizable features from the original
7. Make it humorous and true to the original 241543903 meme aesthetic
8. Ensure the lighting matches a typical refrigerator interior (cool white/blue tones)
9. High quality, photorealistic composite image

Transform this into the viral "241543903" Heads in Freezers meme!"#;

/// Returns the Heads in Freezers instruction, with `custom` appended as an extra section when it is
/// not empty.
pub fn build_prompt(custom: &str) -> String {
    let mut prompt = BASE_PROMPT.to_string();

    if !custom.is_empty() {
        prompt.push_str("\n\nADDITIONAL INSTRUCTIONS: ");
        prompt.push_str(custom);
    }

    prompt
}

/// Instruction sent to the image model once the subject has been described.
pub fn combined_prompt(meme_prompt: &str, description: &str) -> String {
    format!(
        "{meme_prompt}\n\nBased on this source image description: {description}\n\n{VISUAL_REQUIREMENTS}"
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_build_prompt_without_suffix() {
        let prompt = build_prompt("");
        assert_eq!(prompt, BASE_PROMPT);
        assert!(!prompt.contains("ADDITIONAL INSTRUCTIONS"));
    }

    #[test]
    fn test_build_prompt_with_suffix() {
        let prompt = build_prompt("make it blue");
        let (base, extra) = prompt.split_once("\n\nADDITIONAL INSTRUCTIONS: ").unwrap();
        assert_eq!(base, BASE_PROMPT);
        assert_eq!(extra, "make it blue");
        assert_eq!(build_prompt("make it blue"), prompt);
    }

    #[test]
    fn test_combined_prompt() {
        let prompt = combined_prompt("MEME", "a man in a red hat");
        assert!(prompt.starts_with("MEME\n\nBased on this source image description: a man in a red hat"));
        assert!(prompt.contains("CRITICAL VISUAL REQUIREMENTS:"));
        assert!(prompt.ends_with("Heads in Freezers meme!"));
    }
}
