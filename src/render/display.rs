use super::{Control, ControlKind, FormView};
use crate::value::field::format_number;
use std::fmt;

impl fmt::Display for FormView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            writeln!(f, "{} [{}]", section.name, section.reason)?;
            let count = section.controls.len();
            for (i, control) in section.controls.iter().enumerate() {
                fmt_control(control, f, "", i + 1 == count)?;
            }
        }
        let state = if self.save.enabled { "enabled" } else { "disabled" };
        write!(
            f,
            "[Save] ({}, {} pending change{})",
            state,
            self.save.pending_changes,
            if self.save.pending_changes == 1 { "" } else { "s" }
        )
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_control(self, f, "", true)
    }
}

/// Writes one control as a tree line, recursing into action modals.
fn fmt_control(
    control: &Control,
    f: &mut fmt::Formatter<'_>,
    prefix: &str,
    is_last: bool,
) -> fmt::Result {
    let node_marker = if is_last { "└── " } else { "├── " };
    write!(f, "{}{}", prefix, node_marker)?;

    let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });

    match &control.kind {
        ControlKind::TextInput { value } | ControlKind::TextArea { value } => {
            writeln!(f, "{} ({}): \"{}\"", control.label, control.kind.name(), value)
        }
        ControlKind::NumberInput { value } => writeln!(
            f,
            "{} (number input): {}",
            control.label,
            value.map(format_number).unwrap_or_else(|| "-".to_string())
        ),
        ControlKind::Checkbox { checked } => writeln!(
            f,
            "[{}] {}",
            if *checked { "x" } else { " " },
            control.label
        ),
        ControlKind::DateInput { value } => match value {
            Some(d) => writeln!(
                f,
                "{} (date input): {:04}-{:02}-{:02}",
                control.label, d.year, d.month, d.day
            ),
            None => writeln!(f, "{} (date input): -", control.label),
        },
        ControlKind::Select { options, selected } => {
            let shown = selected
                .as_deref()
                .map(|v| {
                    options
                        .iter()
                        .find(|o| o.value == v)
                        .map(|o| o.label.as_str())
                        .unwrap_or(v)
                })
                .unwrap_or("-");
            writeln!(
                f,
                "{} (select, {} options): {}",
                control.label,
                options.len(),
                shown
            )
        }
        ControlKind::MultiSelect { options, selected } => writeln!(
            f,
            "{} (multi-select, {} options): [{}]",
            control.label,
            options.len(),
            selected.join(", ")
        ),
        ControlKind::FileReference { url } => writeln!(
            f,
            "{} (file): {}",
            control.label,
            url.as_deref().unwrap_or("no file")
        ),
        ControlKind::ReadOnly { text } => writeln!(f, "{}: {}", control.label, text),
        ControlKind::Action { modal } => {
            writeln!(f, "<{}> (opens modal)", control.label)?;
            fmt_control(modal, f, &child_prefix, true)
        }
        ControlKind::Placeholder { type_name } => writeln!(
            f,
            "{}: no control for type '{}'",
            control.label, type_name
        ),
    }
}
