//! Rendering dispatch and control capture.
mod common;
use common::*;
use dealform::prelude::*;
use dealform::render::{render_field, render_sections};

#[cfg(test)]
mod render_tests {
    use super::*;

    #[test]
    fn test_unrecognized_type_renders_placeholder() {
        let field = Field::new("signature", "Signature", FieldType::from_name("signature-pad"));
        let control = render_field(&field, None, &OptionSet::default());

        assert_eq!(control.key, "signature");
        assert_eq!(
            control.kind,
            ControlKind::Placeholder {
                type_name: "signature-pad".to_string()
            }
        );
        assert!(matches!(
            control.capture(ControlInput::Text("x".to_string())),
            Err(FormError::NotWritable(_))
        ));
    }

    #[test]
    fn test_static_options_win_over_fetched() {
        let field = Field::new("priority", "Priority", FieldType::Dropdown)
            .with_options(vec![SelectOption::new("Low", "low")]);
        let mut fetched = OptionSet::default();
        fetched.insert(
            "priority".to_string(),
            vec![SelectOption::new("Other", "other")],
        );

        let control = render_field(&field, None, &fetched);
        assert_eq!(
            control.kind,
            ControlKind::Select {
                options: vec![SelectOption::new("Low", "low")],
                selected: None,
            }
        );
    }

    #[test]
    fn test_select_capture_resolves_label() {
        let field = Field::new("pipeline", "Pipeline", FieldType::Dropdown);
        let control = render_field(&field, None, &pipeline_options());

        let captured = control
            .capture(ControlInput::Selected("21960027".to_string()))
            .unwrap();
        assert_eq!(
            captured,
            Some(FieldValue::Choice(SelectOption::new(
                "Installation",
                "21960027"
            )))
        );
    }

    #[test]
    fn test_capture_rejects_mismatched_input() {
        let field = Field::new("site_ready", "Site ready", FieldType::Checkbox);
        let control = render_field(&field, None, &OptionSet::default());

        assert_eq!(
            control.capture(ControlInput::Text("yes".to_string())),
            Err(FormError::InputMismatch {
                key: "site_ready".to_string(),
                expected: "checked",
            })
        );
        assert_eq!(control.capture(ControlInput::Cleared), Ok(None));
    }

    #[test]
    fn test_hidden_sections_are_not_rendered() {
        let schema = deal_schema();
        let state: FormState = [("pipeline", FieldValue::Text("default".to_string()))]
            .into_iter()
            .collect();

        let sections = render_sections(&schema, &state, &pipeline_options());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "Overview");
        assert_eq!(sections[0].controls.len(), 4);
    }

    #[test]
    fn test_form_view_prints_as_tree() {
        let schema = deal_schema();
        let state: FormState = [
            ("dealname", FieldValue::Text("Acme".to_string())),
            ("amount", FieldValue::Number(1200.0)),
        ]
        .into_iter()
        .collect();

        let view = FormView {
            sections: render_sections(&schema, &state, &OptionSet::default()),
            save: dealform::render::SaveButton {
                enabled: true,
                pending_changes: 2,
            },
        };
        let printed = view.to_string();

        assert!(printed.starts_with("Overview [always visible]\n"));
        assert!(printed.contains("├── Deal name (text input): \"Acme\""));
        assert!(printed.contains("├── Amount (number input): 1200"));
        assert!(printed.contains("└── Record ID: "));
        assert!(printed.ends_with("[Save] (enabled, 2 pending changes)"));
    }
}
