//! End-to-end composer scenarios driven through the controller.

use std::cell::Cell;
use std::rc::Rc;

use composer_dom::blocks::find_by_class;
use composer_dom::caret::{offset_of, set_caret_offset, unit_text};
use composer_dom::{
    ComposerOptions, Controller, EditorSurface, Entity, EntityKind, FormattedText, FormattingType,
    InputType, Key, KeyEvent, KeydownResult, ManualClock, Modifiers, NodeId, Position,
    RichTextEditor, SetupOptions, SetupSource, are_formatted_texts_equal, html_to_formatted_text,
    html_to_markdown, markdown_to_formatted_text,
};
use web_time::Duration;

type TestController = Controller<RichTextEditor, ManualClock>;

fn make_controller() -> (TestController, ManualClock) {
    let clock = ManualClock::new();
    let controller =
        Controller::with_clock(RichTextEditor::new(), ComposerOptions::default(), clock.clone());
    (controller, clock)
}

fn with_content(ft: &FormattedText) -> (TestController, ManualClock) {
    let (mut controller, clock) = make_controller();
    controller.setup(Some(ft), SetupOptions::new(SetupSource::Host));
    (controller, clock)
}

fn element_with_class(controller: &TestController, class: &str) -> NodeId {
    let editor = controller.editor();
    find_by_class(editor.document(), editor.root(), class).unwrap()
}

/// The caret's offset inside `element`, if the caret is inside it.
fn caret_in(controller: &TestController, element: NodeId) -> Option<usize> {
    let doc = controller.editor().document();
    let start = doc.selection()?.start;
    doc.contains(element, start.node)
        .then(|| offset_of(doc, element, start))
}

fn cpp_block() -> FormattedText {
    FormattedText::new(
        "int x;",
        vec![Entity::new(
            EntityKind::Pre {
                language: Some("cpp".into()),
            },
            0,
            6,
        )],
    )
}

fn shift_enter() -> KeyEvent {
    KeyEvent::with_modifiers(Key::Enter, Modifiers::SHIFT)
}

fn settle(controller: &mut TestController, clock: &ManualClock) {
    clock.advance(Duration::from_millis(500));
    controller.run_pending();
}

// === Extraction ===

#[test]
fn test_round_trip_through_both_paths() {
    let samples = vec![
        FormattedText::plain("just text"),
        FormattedText::new("Hello world!", vec![Entity::new(EntityKind::Bold, 6, 5)]),
        FormattedText::new(
            "mixed styles here",
            vec![
                Entity::new(EntityKind::Italic, 0, 5),
                Entity::new(EntityKind::Underline, 6, 6),
                Entity::new(EntityKind::Spoiler, 13, 4),
            ],
        ),
        FormattedText::new(
            "see docs now",
            vec![Entity::new(
                EntityKind::TextUrl {
                    url: "https://docs.rs".into(),
                },
                4,
                4,
            )],
        ),
        FormattedText::new(
            "one\ntwo\nthree\nfour\nfive",
            vec![Entity::new(EntityKind::Blockquote { collapsed: true }, 0, 23)],
        ),
        FormattedText::new(
            "fn main() {}",
            vec![Entity::new(
                EntityKind::Pre {
                    language: Some("rust".into()),
                },
                0,
                12,
            )],
        ),
        FormattedText::new(
            "nice 🙂",
            vec![Entity::new(
                EntityKind::CustomEmoji {
                    document_id: "100".into(),
                },
                5,
                2,
            )],
        ),
    ];

    for ft in samples {
        let (controller, _) = with_content(&ft);
        let editor = controller.editor();
        let via_tokens = html_to_formatted_text(editor.document(), editor.root()).unwrap();
        let via_markdown =
            markdown_to_formatted_text(&html_to_markdown(editor.document(), editor.root())).unwrap();

        assert!(are_formatted_texts_equal(Some(&ft), Some(&via_tokens)), "{via_tokens:?}");
        assert!(
            are_formatted_texts_equal(Some(&via_tokens), Some(&via_markdown)),
            "{via_markdown:?}"
        );
    }
}

#[test]
fn test_extraction_sweep_over_edge_shapes() {
    let e = Entity::new;
    let quote = || EntityKind::Blockquote { collapsed: false };
    let rust = || EntityKind::Pre {
        language: Some("rust".into()),
    };

    // (name, rendered, expected back). Zero-length inline entities render as
    // nothing, so they do not come back.
    let cases = vec![
        (
            "nested",
            FormattedText::new(
                "one two three",
                vec![e(EntityKind::Bold, 0, 13), e(EntityKind::Italic, 4, 3)],
            ),
            None,
        ),
        (
            "nested three deep",
            FormattedText::new(
                "abc",
                vec![
                    e(EntityKind::Bold, 0, 3),
                    e(EntityKind::Italic, 0, 3),
                    e(EntityKind::Strike, 1, 1),
                ],
            ),
            None,
        ),
        (
            "zero length inline",
            FormattedText::new(
                "ab",
                vec![e(EntityKind::Italic, 0, 0), e(EntityKind::Code, 2, 0)],
            ),
            Some(FormattedText::plain("ab")),
        ),
        (
            "zero length nested",
            FormattedText::new(
                "abc",
                vec![e(EntityKind::Bold, 0, 3), e(EntityKind::Underline, 1, 0)],
            ),
            Some(FormattedText::new("abc", vec![e(EntityKind::Bold, 0, 3)])),
        ),
        (
            "inline filling a quote",
            FormattedText::new(
                "quoted\nafter",
                vec![e(quote(), 0, 6), e(EntityKind::Bold, 0, 6)],
            ),
            None,
        ),
        (
            "inline right after a quote",
            FormattedText::new(
                "quote\nbold",
                vec![e(quote(), 0, 5), e(EntityKind::Bold, 6, 4)],
            ),
            None,
        ),
        (
            "inline right before a code block",
            FormattedText::new(
                "lead\ncode",
                vec![e(EntityKind::Bold, 0, 4), e(rust(), 5, 4)],
            ),
            None,
        ),
        (
            "surrogate pairs around a format",
            FormattedText::new("😀 bold 🎉", vec![e(EntityKind::Bold, 3, 4)]),
            None,
        ),
        (
            "format over surrogate pairs",
            FormattedText::new(
                "a😀b 🎉🎉 ok",
                vec![e(EntityKind::Italic, 1, 2), e(EntityKind::Spoiler, 5, 4)],
            ),
            None,
        ),
        (
            "surrogate pairs in a quote",
            FormattedText::new("😀😀\nx", vec![e(quote(), 0, 4)]),
            None,
        ),
    ];

    for (name, ft, expected) in cases {
        let expected = expected.unwrap_or_else(|| ft.clone());
        let (controller, _) = with_content(&ft);
        let extracted = controller.get_formatted_text().unwrap();
        assert!(
            are_formatted_texts_equal(Some(&expected), Some(&extracted)),
            "{name}: {extracted:?}"
        );
    }
}

#[test]
fn test_typed_markdown_becomes_bold() {
    let (mut controller, clock) = make_controller();
    controller.editor_mut().set_caret_offset(0);
    controller
        .editor_mut()
        .execute(&InputType::InsertText("Hello **world**!".into()));
    controller.observe();
    settle(&mut controller, &clock);

    assert_eq!(
        controller.get_formatted_text().unwrap(),
        FormattedText::new("Hello world!", vec![Entity::new(EntityKind::Bold, 6, 5)])
    );
}

#[test]
fn test_code_block_extracts_content_only() {
    let ft = cpp_block();
    let (controller, _) = with_content(&ft);

    let extracted = controller.get_formatted_text().unwrap();
    assert_eq!(extracted.text, "int x;");
    assert_eq!(extracted, ft);
    assert!(controller.get_html().contains(r#"data-language="cpp""#));
}

// === Formatting ===

#[test]
fn test_format_toggle_pair_restores_text() {
    let (mut controller, _) = with_content(&FormattedText::plain("make bold"));

    controller.editor_mut().select_offsets(5, 9);
    assert!(controller.apply_format_to_selected_text(FormattingType::Bold));
    controller.check_markdown_now();
    assert_eq!(
        controller.get_formatted_text().unwrap().entities,
        vec![Entity::new(EntityKind::Bold, 5, 4)]
    );

    // Content sits between the two-glyph markers.
    controller.editor_mut().select_offsets(7, 11);
    let info = controller.get_selected_text_info();
    assert!(info.active_formats.contains(&FormattingType::Bold));
    assert!(controller.apply_format_to_selected_text(FormattingType::Bold));

    assert_eq!(
        controller.get_formatted_text().unwrap(),
        FormattedText::plain("make bold")
    );
}

#[test]
fn test_link_control_and_insert() {
    let (mut controller, _) = with_content(&FormattedText::plain("read the docs"));
    controller.editor_mut().select_offsets(9, 13);

    assert_eq!(
        controller.press(&KeyEvent::ctrl('k')),
        KeydownResult::OpenLinkControl
    );
    assert!(controller.insert_link("docs.rs"));
    assert_eq!(
        controller.get_formatted_text().unwrap(),
        FormattedText::new(
            "read the docs",
            vec![Entity::new(
                EntityKind::TextUrl {
                    url: "https://docs.rs".into()
                },
                9,
                4
            )]
        )
    );
}

// === Block rules ===

#[test]
fn test_backspace_in_empty_quote_removes_it() {
    let ft = FormattedText::new(
        "",
        vec![Entity::new(EntityKind::Blockquote { collapsed: false }, 0, 0)],
    );
    let (mut controller, _) = with_content(&ft);
    let container = element_with_class(&controller, "container");
    controller
        .editor_mut()
        .document_mut()
        .set_caret(Position::new(container, 0));

    assert_eq!(
        controller.press(&KeyEvent::new(Key::Backspace)),
        KeydownResult::Handled
    );
    let extracted = controller.get_formatted_text().unwrap();
    assert!(extracted.entities.is_empty());
    assert!(controller.is_html_empty());
}

#[test]
fn test_enter_on_third_line_escapes_quote_upward() {
    let ft = FormattedText::new(
        "\n\nabc",
        vec![Entity::new(EntityKind::Blockquote { collapsed: false }, 0, 5)],
    );
    let (mut controller, _) = with_content(&ft);
    let container = element_with_class(&controller, "container");
    set_caret_offset(controller.editor_mut().document_mut(), container, 2);

    // Plain Enter sends; the quote rules apply to the line-break combination.
    assert_eq!(controller.press(&shift_enter()), KeydownResult::Handled);
    assert_eq!(
        controller.get_formatted_text().unwrap(),
        FormattedText::new(
            "\nabc",
            vec![Entity::new(EntityKind::Blockquote { collapsed: false }, 1, 3)]
        )
    );

    let editor = controller.editor();
    let doc = editor.document();
    let first = doc.first_child(editor.root()).unwrap();
    assert!(doc.is_tag(first, "br"));
}

#[test]
fn test_enter_after_two_empty_last_lines_escapes_quote_downward() {
    let ft = FormattedText::new(
        "abc\n\n",
        vec![Entity::new(EntityKind::Blockquote { collapsed: false }, 0, 5)],
    );
    let (mut controller, _) = with_content(&ft);
    let container = element_with_class(&controller, "container");
    set_caret_offset(controller.editor_mut().document_mut(), container, 5);

    assert_eq!(controller.press(&shift_enter()), KeydownResult::Handled);
    assert!(controller.get_html().ends_with("</blockquote></span><br>"));
    assert_eq!(unit_text(controller.editor().document(), container), "abc");
    assert_eq!(controller.editor().caret_offset(), Some(4));
}

#[test]
fn test_backspace_at_quote_start_moves_to_previous_line() {
    let ft = FormattedText::new(
        "before\nquoted",
        vec![Entity::new(EntityKind::Blockquote { collapsed: false }, 7, 6)],
    );
    let (mut controller, _) = with_content(&ft);
    let html = controller.get_html();
    let container = element_with_class(&controller, "container");
    set_caret_offset(controller.editor_mut().document_mut(), container, 0);

    assert_eq!(
        controller.press(&KeyEvent::new(Key::Backspace)),
        KeydownResult::Handled
    );
    assert_eq!(controller.get_html(), html);
    assert_eq!(controller.editor().caret_offset(), Some(6));
    assert_eq!(caret_in(&controller, container), None);
}

#[test]
fn test_backspace_before_code_fence_breaks_line() {
    let (mut controller, _) = with_content(&cpp_block());
    let header = element_with_class(&controller, "code-header");
    controller
        .editor_mut()
        .document_mut()
        .set_caret(Position::new(header, 0));

    assert_eq!(
        controller.press(&KeyEvent::new(Key::Backspace)),
        KeydownResult::Handled
    );
    assert!(
        controller
            .get_html()
            .starts_with(r#"<br><div class="CodeBlock""#)
    );
    assert_eq!(controller.editor().caret_offset(), Some(1));
}

#[test]
fn test_enter_in_code_header_moves_into_content() {
    let (mut controller, _) = with_content(&cpp_block());
    let html = controller.get_html();
    let header = element_with_class(&controller, "code-header");
    let content = element_with_class(&controller, "code-content");
    controller
        .editor_mut()
        .document_mut()
        .set_caret(Position::new(header, 1));

    assert_eq!(controller.press(&shift_enter()), KeydownResult::Handled);
    assert_eq!(controller.get_html(), html);
    assert_eq!(caret_in(&controller, content), Some(0));
}

#[test]
fn test_backspace_at_footer_start_moves_to_content() {
    let (mut controller, _) = with_content(&cpp_block());
    let html = controller.get_html();
    let footer = element_with_class(&controller, "code-footer");
    let content = element_with_class(&controller, "code-content");
    controller
        .editor_mut()
        .document_mut()
        .set_caret(Position::new(footer, 0));

    assert_eq!(
        controller.press(&KeyEvent::new(Key::Backspace)),
        KeydownResult::Handled
    );
    assert_eq!(controller.get_html(), html);
    assert_eq!(caret_in(&controller, content), Some(0));
}

#[test]
fn test_block_edits_are_single_undo_steps() {
    let ft = FormattedText::new(
        "code",
        vec![Entity::new(EntityKind::Pre { language: None }, 0, 4)],
    );
    let (mut controller, _) = with_content(&ft);
    let footer = element_with_class(&controller, "code-footer");
    controller
        .editor_mut()
        .document_mut()
        .set_caret(Position::new(footer, 1));

    controller.press(&KeyEvent::new(Key::Backspace));
    assert_eq!(
        controller.get_formatted_text().unwrap(),
        FormattedText::plain("code")
    );

    assert!(controller.undo());
    assert_eq!(controller.get_formatted_text().unwrap(), ft);
    assert!(controller.redo());
    assert_eq!(
        controller.get_formatted_text().unwrap(),
        FormattedText::plain("code")
    );
}

#[test]
fn test_delete_removes_current_block() {
    let ft = FormattedText::new(
        "before\nquoted",
        vec![Entity::new(EntityKind::Blockquote { collapsed: false }, 7, 6)],
    );
    let (mut controller, _) = with_content(&ft);
    let container = element_with_class(&controller, "container");
    set_caret_offset(controller.editor_mut().document_mut(), container, 2);

    assert_eq!(
        controller.press(&KeyEvent::new(Key::Delete)),
        KeydownResult::Handled
    );
    let extracted = controller.get_formatted_text().unwrap();
    assert!(extracted.entities.is_empty());
    assert_eq!(extracted.text.trim_end(), "before");
}

#[test]
fn test_modified_delete_keeps_block() {
    let ft = FormattedText::new(
        "before\nquoted",
        vec![Entity::new(EntityKind::Blockquote { collapsed: false }, 7, 6)],
    );
    let (mut controller, _) = with_content(&ft);
    let before = controller.get_formatted_text().unwrap();
    let container = element_with_class(&controller, "container");

    let alt = Modifiers {
        alt: true,
        ..Modifiers::NONE
    };
    for modifiers in [Modifiers::CTRL, Modifiers::META, alt] {
        set_caret_offset(controller.editor_mut().document_mut(), container, 2);
        assert_eq!(
            controller.press(&KeyEvent::with_modifiers(Key::Delete, modifiers)),
            KeydownResult::NotHandled
        );
        assert_eq!(controller.get_formatted_text().unwrap(), before);
    }
    assert_eq!(before.entities.len(), 1);
}

// === Listeners ===

#[test]
fn test_unsubscribe_stops_notifications() {
    let (mut controller, clock) = make_controller();
    let count = Rc::new(Cell::new(0));
    let counter = Rc::clone(&count);
    let subscription = controller.listen(move |_| counter.set(counter.get() + 1));

    controller.editor_mut().set_caret_offset(0);
    controller.press(&KeyEvent::character('a'));
    assert_eq!(count.get(), 1);

    subscription.unsubscribe();
    controller.press(&KeyEvent::character('b'));
    settle(&mut controller, &clock);
    assert_eq!(count.get(), 1);
    assert_eq!(controller.get_html(), "ab");
}
