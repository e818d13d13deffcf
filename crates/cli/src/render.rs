use roster_core::{Answer, AnswerRoute};

/// Human-readable rendering of an answer for the terminal.
pub fn answer_text(answer: &Answer) -> String {
    let mut out = answer.text.trim_end().to_string();
    if let Some(sources) = &answer.sources {
        out.push_str("\n\nSources:");
        if sources.is_empty() {
            out.push_str(" none");
        }
        for doc in sources {
            out.push_str(&format!(
                "\n  [row {}] {}",
                doc.metadata.row_index,
                snippet(&doc.content, 160)
            ));
        }
    }
    if let Some(confidence) = answer.confidence {
        out.push_str(&format!("\nConfidence: {confidence:.2}"));
    }
    let route = match answer.route {
        AnswerRoute::Structured => "structured lookup",
        AnswerRoute::Retrieval => "retrieval",
    };
    out.push_str(&format!("\n(answered by {route})"));
    out
}

/// Truncates on a char boundary and marks the cut.
pub fn snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

pub fn problems_text(problems: &[String]) -> String {
    if problems.is_empty() {
        return "configuration ok".to_string();
    }
    let mut out = format!("{} problem(s):", problems.len());
    for p in problems {
        out.push_str("\n  - ");
        out.push_str(p);
    }
    out
}
