//! Plain-text rendering of a [`DebateReport`].

use std::fmt;

use super::{DebateReport, REASONING_WRAP_WIDTH};

/// Indent for reasoning lines under an agent block.
const REASONING_INDENT: usize = 6;

/// Full width of the rule lines.
const RULE_WIDTH: usize = REASONING_WRAP_WIDTH + REASONING_INDENT;

/// Greedy word wrap at `width` characters. Words longer than `width` are
/// split. Whitespace runs collapse to a single space.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let split = word
                .char_indices()
                .nth(width)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            lines.push(word[..split].to_string());
            word = &word[split..];
        }
        if word.is_empty() {
            continue;
        }

        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

impl fmt::Display for DebateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);
        let indent = " ".repeat(REASONING_INDENT);

        writeln!(f, "{heavy}")?;
        writeln!(f, " DEBATE SUMMARY: {} vs {}", self.home_team, self.away_team)?;
        writeln!(f, "{heavy}")?;

        for (i, agent) in self.agents.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "[{}] {} (weight {:.2})", i + 1, agent.agent_id, agent.weight)?;
            let p = &agent.prediction_pct;
            writeln!(
                f,
                "    Prediction: Home {:.1}% | Draw {:.1}% | Away {:.1}%",
                p.home_win, p.draw, p.away_win
            )?;
            writeln!(f, "    Confidence: {:.1}%", agent.confidence_pct)?;
            writeln!(f, "    Reasoning:")?;
            if agent.reasoning_lines.is_empty() {
                writeln!(f, "{indent}(no reasoning provided)")?;
            }
            for line in &agent.reasoning_lines {
                writeln!(f, "{indent}{line}")?;
            }
            if !agent.key_factors.is_empty() {
                writeln!(f, "    Key factors: {}", agent.key_factors.join(", "))?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{light}")?;
        writeln!(f, " WEIGHTED CONTRIBUTIONS (value x weight)")?;
        writeln!(f, "{light}")?;
        let id_width = self
            .contributions
            .iter()
            .map(|c| c.agent_id.chars().count())
            .max()
            .unwrap_or(0);
        for c in &self.contributions {
            writeln!(
                f,
                "    {:<id_width$}  H={:.3}  D={:.3}  A={:.3}",
                c.agent_id, c.home_win, c.draw, c.away_win
            )?;
        }

        let consensus = &self.consensus;
        let p = &consensus.prediction_pct;
        writeln!(f)?;
        writeln!(f, "{heavy}")?;
        writeln!(f, " CONSENSUS")?;
        writeln!(f, "{heavy}")?;
        writeln!(
            f,
            "    Home Win {:.2}% | Draw {:.2}% | Away Win {:.2}%",
            p.home_win, p.draw, p.away_win
        )?;
        writeln!(
            f,
            "    Most likely: {} ({:.2}%)",
            consensus.most_likely, consensus.most_likely_pct
        )?;
        writeln!(
            f,
            "    Confidence: {:.2}% | Agreement: {:.2} ({})",
            consensus.confidence_pct, consensus.agreement_score, consensus.agreement_level
        )?;
        if consensus.fallback_prior {
            writeln!(f, "    Note: no weighted evidence, uniform prior returned")?;
        }
        if consensus.degraded {
            writeln!(f, "    Note: every agent degraded, confidence held at the floor")?;
        }
        if !self.common_factors.is_empty() {
            writeln!(f, "    Shared factors: {}", self.common_factors.join(", "))?;
        }
        write!(f, "{heavy}")
    }
}
