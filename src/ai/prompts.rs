use std::fmt::Write;

use crate::models::ContentItem;

pub fn system_prompt(domain: &str) -> String {
    format!(
        r#"You are an expert analyst creating quick-scan summaries for a busy executive in the {domain} field.

Create ultra-concise summaries optimised for rapid triage:
- Highlight only the most significant insights or breakthroughs relevant to {domain}
- One sentence per item focussing on what's new, important, or actionable
- Filter out routine content - only include items worth deeper attention
- Use precise but concise technical language
- Prioritise novelty, strategic importance, and unexpected findings

Goal: Help readers quickly decide what deserves their limited time and attention."#
    )
}

/// Prompt for a single-pass distil over all `items`.
pub fn distil_prompt(items: &[ContentItem], reading_time: u32, domain: &str) -> String {
    let mut prompt = format!(
        r#"Generate a {reading_time}-minute weekly distil for quick scanning and prioritisation.

**Instructions:**
- Group content by theme when clear patterns emerge
- For each item: ONE concise sentence highlighting what's new/important for {domain}
- Include links as [Title](URL)
- Use bullet points for rapid scanning
- Keep summaries brief - goal is to quickly decide what deserves deeper attention
- End with "Key Takeaways" section (3-5 bullets)

**Content ({} items):**

"#,
        items.len()
    );
    push_items(&mut prompt, items);
    prompt
}

/// Prompt for one batch of the map phase.
pub fn batch_prompt(items: &[ContentItem]) -> String {
    let hints: Vec<String> = items
        .iter()
        .take(2)
        .map(|item| item.title.split_whitespace().take(3).collect::<Vec<_>>().join(" "))
        .collect();

    let description = if items.len() > 2 {
        format!("topics including {}, {}, etc.", hints[0], hints[1])
    } else {
        format!("topics: {}", hints.join(", "))
    };

    let mut prompt = format!(
        r#"Summarise this set of content items about {description}

**Instructions:**
- Create concise summaries highlighting key insights and strategic relevance
- Group by theme where possible
- Include titles and links: [Title](URL)
- Use bullet points for readability
- Focus on what's new, important, or actionable
- Do NOT mention "batch" in your response

**Content ({} items):**

"#,
        items.len()
    );
    push_items(&mut prompt, items);
    prompt
}

/// Prompt for the reduce phase, one section per batch summary in order.
pub fn consolidation_prompt(summaries: &[String], reading_time: u32) -> String {
    let mut prompt = format!(
        r#"Consolidate these batch summaries into a final {reading_time}-minute weekly distil report.

**Instructions:**
- Merge related themes across batches
- Maintain all links and specific details
- Create coherent narrative flow
- End with "Key Takeaways" section (3-5 bullets)
- Target {reading_time} minutes reading time
- Use markdown formatting with clear sections

**Batch Summaries to Consolidate:**

"#
    );
    for (i, summary) in summaries.iter().enumerate() {
        let _ = write!(prompt, "\n## Batch {} Summary\n{}\n", i + 1, summary);
    }
    prompt
}

fn push_items(prompt: &mut String, items: &[ContentItem]) {
    for (i, item) in items.iter().enumerate() {
        let _ = write!(
            prompt,
            "\n### Item {}\n**Title:** {}\n**Link:** {}\n**Content:** {}\n",
            i + 1,
            item.title,
            item.link,
            item.content
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(title: &str) -> ContentItem {
        ContentItem::article("Feed", "https://f", title, "body", format!("https://x/{title}"), Utc::now())
    }

    #[test]
    fn batch_prompt_describes_first_two_titles() {
        let items = vec![
            item("Protein folding at scale today"),
            item("New kinase inhibitor trial"),
            item("Third"),
        ];
        let prompt = batch_prompt(&items);

        assert!(prompt.starts_with(
            "Summarise this set of content items about topics including Protein folding at, New kinase inhibitor, etc."
        ));
        assert!(prompt.contains("**Content (3 items):**"));
        assert!(prompt.contains("### Item 3\n**Title:** Third"));
    }

    #[test]
    fn batch_prompt_with_single_item() {
        let prompt = batch_prompt(&[item("Solo")]);
        assert!(prompt.contains("about topics: Solo"));
    }

    #[test]
    fn consolidation_prompt_lists_batches_in_order() {
        let summaries = vec!["first".to_string(), "second".to_string()];
        let prompt = consolidation_prompt(&summaries, 7);

        assert!(prompt.contains("final 7-minute weekly distil"));
        assert!(prompt.contains("Target 7 minutes reading time"));
        let one = prompt.find("## Batch 1 Summary\nfirst").unwrap();
        let two = prompt.find("## Batch 2 Summary\nsecond").unwrap();
        assert!(one < two);
    }

    #[test]
    fn distil_prompt_mentions_domain_and_links() {
        let prompt = distil_prompt(&[item("A"), item("B")], 5, "genomics");
        assert!(prompt.contains("important for genomics"));
        assert!(prompt.contains("**Link:** https://x/B"));
        assert!(prompt.contains("**Content (2 items):**"));
    }
}
