use crate::model::{ContentBlock, Document, Section};

pub fn render_document(document: &Document) -> String {
    let mut out = String::new();
    render_blocks(&mut out, &document.preamble);
    for section in &document.sections {
        render_section(&mut out, section);
    }
    out
}

pub fn render_section(out: &mut String, section: &Section) {
    push_chunk(
        out,
        &format!("{} {}", "#".repeat(usize::from(section.level)), section.heading),
    );
    render_blocks(out, &section.blocks);
    for child in &section.children {
        render_section(out, child);
    }
}

pub fn render_blocks(out: &mut String, blocks: &[ContentBlock]) {
    for block in blocks {
        push_chunk(out, &render_block(block));
    }
}

pub fn render_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Paragraph(text) => text.clone(),
        ContentBlock::CodeBlock { fence, info, text } => {
            if text.is_empty() {
                format!("{fence}{info}\n{fence}")
            } else {
                format!("{fence}{info}\n{text}\n{fence}")
            }
        }
        ContentBlock::Table { rows, alignment } => {
            let mut lines = Vec::with_capacity(rows.len() + 1);
            for (index, row) in rows.iter().enumerate() {
                lines.push(render_row(row));
                if index == 0 {
                    lines.push(render_row(alignment));
                }
            }
            lines.join("\n")
        }
    }
}

fn render_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

/// Appends a block separated from the previous one by a blank line.
fn push_chunk(out: &mut String, chunk: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(chunk);
    out.push('\n');
}
