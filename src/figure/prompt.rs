use super::{GenerationOptions, GenerationRequest, ReferenceImage};

const SCENE_INSTRUCTION: &str = "Environment: Place the figure on a computer desk. \
On the computer screen behind it, display the ZBrush modeling process of this figure. \
Next to the computer screen, place a TAMIYA-style toy packaging box printed with the original artwork.";

/// Builds the instruction text sent alongside the reference image.
pub fn compose(options: &GenerationOptions) -> String {
    let mut prompt = format!(
        "Create a {} model figure based on the attached reference image. Style: {}. Base: {}. {}",
        options.scale, options.style, options.base, SCENE_INSTRUCTION
    );

    if !options.free_text.is_empty() {
        prompt.push_str(" Additional details: ");
        prompt.push_str(&options.free_text);
    }

    prompt
}

pub fn build_request(options: &GenerationOptions, reference: ReferenceImage) -> GenerationRequest {
    GenerationRequest {
        prompt: compose(options),
        aspect_ratio: options.aspect_ratio,
        reference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AspectRatio;

    fn options(free_text: &str) -> GenerationOptions {
        GenerationOptions {
            scale: "1/7 scale".to_string(),
            style: "realistic style".to_string(),
            base: "wooden base".to_string(),
            aspect_ratio: AspectRatio::Wide,
            free_text: free_text.to_string(),
        }
    }

    #[test]
    fn renders_fixed_template_without_details() {
        let prompt = compose(&options(""));
        assert!(prompt.starts_with(
            "Create a 1/7 scale model figure based on the attached reference image. Style: realistic style. Base: wooden base."
        ));
        assert!(prompt.ends_with("printed with the original artwork."));
        assert!(!prompt.contains("Additional details"));
        assert!(!prompt.ends_with(' '));
    }

    #[test]
    fn appends_details_exactly_once() {
        let prompt = compose(&options("pink hair, holding a sword"));
        assert_eq!(prompt.matches("Additional details:").count(), 1);
        assert!(prompt.ends_with(
            "original artwork. Additional details: pink hair, holding a sword"
        ));
    }

    #[test]
    fn details_are_appended_verbatim() {
        let prompt = compose(&options("  pink hair\n"));
        assert!(prompt.ends_with("original artwork. Additional details:   pink hair\n"));

        let prompt = compose(&options("   "));
        assert!(prompt.ends_with("original artwork. Additional details:    "));
        assert_eq!(prompt.matches("Additional details:").count(), 1);
    }

    #[test]
    fn each_slot_changes_only_its_own_text() {
        let baseline = compose(&options(""));

        let mut changed = options("");
        changed.style = "anime style".to_string();
        let restyled = compose(&changed);
        assert_ne!(baseline, restyled);
        assert_eq!(
            restyled,
            baseline.replace("Style: realistic style.", "Style: anime style.")
        );

        let mut changed = options("");
        changed.base = "marble base".to_string();
        assert_eq!(
            compose(&changed),
            baseline.replace("Base: wooden base.", "Base: marble base.")
        );

        let mut changed = options("");
        changed.scale = "1/4 scale".to_string();
        assert_eq!(
            compose(&changed),
            baseline.replace("Create a 1/7 scale", "Create a 1/4 scale")
        );
    }

    #[test]
    fn request_carries_aspect_ratio_and_reference() {
        let reference = ReferenceImage::from_data_uri("data:image/png;base64,AAAA");
        let request = build_request(&options(""), reference.clone());
        assert_eq!(request.aspect_ratio, AspectRatio::Wide);
        assert_eq!(request.reference, reference);
        assert_eq!(request.prompt, compose(&options("")));
    }
}
