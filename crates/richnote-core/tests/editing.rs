// Integration tests driving RichEditor the way a host text view does:
// before_text_change, then replace, then after_text_change for each keystroke.

use richnote_core::markdown::format_document;
use richnote_core::mention::mention_attributes;
use richnote_core::{
    AttributedText, Attributes, Color, EditorConfig, EditorEvent, ListItem, Mentionable,
    RichEditor, Selection, Span, StyleRegistry,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn type_str(editor: &mut RichEditor, s: &str) {
    for ch in s.chars() {
        let at = editor.selection().head;
        let ch = ch.to_string();
        if editor.before_text_change(at..at, &ch) {
            assert!(editor.replace(at..at, &ch));
            editor.after_text_change();
        }
        assert!(editor.text().is_partitioned());
    }
}

fn backspace(editor: &mut RichEditor) {
    let at = editor.selection().head;
    if editor.before_text_change(at - 1..at, "") {
        assert!(editor.replace(at - 1..at, ""));
        editor.after_text_change();
    }
    assert!(editor.text().is_partitioned());
}

/// One entry per stretch of equally tagged text, e.g. `"Hello"[b] " world"`.
fn dump(text: &AttributedText) -> String {
    let mut pieces: Vec<(String, String)> = Vec::new();
    for run in text.runs() {
        let mut tags = Vec::new();
        if run.attrs.is_bold() {
            tags.push("b".to_owned());
        }
        if run.attrs.is_italic() {
            tags.push("i".to_owned());
        }
        if run.attrs.underline {
            tags.push("u".to_owned());
        }
        if run.attrs.strikethrough {
            tags.push("s".to_owned());
        }
        if let Some(mention) = &run.attrs.mention {
            tags.push(format!("@{}", mention.id));
        }
        if let Some(item) = run.attrs.list {
            tags.push(item.to_string());
        }
        let tags = tags.join(",");
        let slice = text.slice(run.range.clone()).unwrap_or_default();
        match pieces.last_mut() {
            Some((last_tags, body)) if *last_tags == tags && run.attrs.mention.is_none() => {
                body.push_str(&slice)
            }
            _ => pieces.push((tags, slice.to_string())),
        }
    }
    pieces
        .into_iter()
        .map(|(tags, body)| {
            if tags.is_empty() {
                format!("{body:?}")
            } else {
                format!("{body:?}[{tags}]")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

struct Contact {
    id: i64,
    name: &'static str,
}

impl Mentionable for Contact {
    fn id(&self) -> i64 {
        self.id
    }

    fn text(&self) -> &str {
        self.name
    }
}

#[test]
fn ordered_list_typing_enter_and_backspace() {
    init_tracing();
    let mut editor = RichEditor::new();

    type_str(&mut editor, "1. ");
    assert_eq!(editor.text().text(), "1.");
    assert_eq!(editor.text().list_item_at(0), Some(ListItem::ordered(1)));
    assert_eq!(editor.selection(), Selection::collapsed(2));

    type_str(&mut editor, "first\n");
    assert_eq!(editor.text().text(), "1.first\n2.");
    assert_eq!(editor.text().list_item_at(8), Some(ListItem::ordered(2)));
    assert_eq!(editor.selection(), Selection::collapsed(10));

    backspace(&mut editor);
    assert_eq!(editor.selection(), Selection::collapsed(7));
    assert_eq!(editor.text().list_item_at(8), None);
    insta::assert_snapshot!(dump(editor.text()), @r#""1."[ordered(1)] "first\n""#);
}

#[test]
fn enter_on_marker_only_line_ends_list() {
    let mut editor = RichEditor::new();
    type_str(&mut editor, "- milk\n");
    assert_eq!(editor.text().text(), "–milk\n–");
    type_str(&mut editor, "\n");
    assert_eq!(editor.text().text(), "–milk\n");
    assert_eq!(editor.selection(), Selection::collapsed(6));
}

#[test]
fn inserting_between_ordered_items_renumbers_following() {
    let mut editor = RichEditor::new();
    editor.load_markdown("3. c\n4. d\n5. e");
    assert_eq!(editor.text().text(), "3.c\n4.d\n5.e");

    editor.selection_changed(3..3);
    type_str(&mut editor, "\n");
    assert_eq!(editor.text().text(), "3.c\n4.\n5.d\n6.e");
    assert_eq!(editor.selection(), Selection::collapsed(6));

    type_str(&mut editor, "x");
    assert_eq!(editor.to_markdown(), "3. c\n4. x\n5. d\n6. e");
}

#[test]
fn live_bold_then_plain_text() {
    let mut editor = RichEditor::new();
    type_str(&mut editor, "**Hello**");
    assert_eq!(editor.text().text(), "Hello ");
    assert_eq!(editor.selection(), Selection::collapsed(6));
    type_str(&mut editor, "world");
    assert_eq!(editor.text().text(), "Hello world");

    insta::assert_snapshot!(dump(editor.text()), @r#""Hello"[b] " world""#);
    assert_eq!(editor.to_markdown(), "**Hello** world");
}

#[test]
fn mention_pick_and_atomic_removal() {
    init_tracing();
    let mut editor = RichEditor::new();
    let bob = Contact { id: 42, name: "bob" };

    type_str(&mut editor, "hi @bo");
    assert_eq!(
        editor.drain_events(),
        vec![
            EditorEvent::MentionStarted { location: 3 },
            EditorEvent::SearchTextChanged("b".into()),
            EditorEvent::SearchTextChanged("bo".into()),
        ]
    );

    let caret = editor.add_mention(&bob).unwrap();
    assert_eq!(editor.text().text(), "hi @bob ");
    assert_eq!(caret.offset, 8);
    assert!(!editor.mention_state().is_active());

    editor.selection_changed(6..6);
    editor.drain_events();
    backspace(&mut editor);

    assert_eq!(editor.text().text(), "hi  ");
    assert_eq!(editor.selection(), Selection::collapsed(3));
    assert_eq!(editor.drain_events(), vec![EditorEvent::MentionRemoved { id: 42 }]);
    assert_eq!(editor.mention_state().symbol_location(), Some(3));
    assert!(editor.text().runs().all(|run| run.attrs.mention.is_none()));
}

#[test]
fn typing_inside_mention_is_refused() {
    let mut editor: RichEditor = RichEditor::new();
    editor.append_mention(&Contact { id: 1, name: "amy" }).unwrap();
    assert_eq!(editor.text().text(), "@amy ");

    editor.selection_changed(2..2);
    assert!(!editor.before_text_change(2..2, "x"));
    assert_eq!(editor.take_caret_hint().map(|hint| hint.offset), Some(4));
    assert_eq!(editor.text().text(), "@amy ");
}

#[test]
fn deleting_the_symbol_ends_search() {
    let mut editor = RichEditor::new();
    type_str(&mut editor, "@");
    editor.drain_events();
    backspace(&mut editor);
    assert_eq!(editor.drain_events(), vec![EditorEvent::SymbolRemoved]);
    assert!(!editor.mention_state().is_active());
    assert_eq!(editor.text().text(), "");
}

#[test]
fn toolbar_lists_over_selection() {
    let mut editor = RichEditor::new();
    editor.load_markdown("alpha\nbeta\ngamma");
    editor.selection_changed(0..16);
    let range = editor.apply_list(ListItem::BULLET).unwrap();
    assert_eq!(editor.text().text(), "•alpha\n•beta\n•gamma");
    assert_eq!(range, 1..19);

    editor.selection_changed(8..8);
    editor.apply_list(ListItem::ordered(1)).unwrap();
    assert_eq!(editor.to_markdown(), "* alpha\n1. beta\n* gamma");

    editor.selection_changed(9..9);
    editor.remove_list().unwrap();
    assert_eq!(editor.to_markdown(), "* alpha\nbeta\n* gamma");
    insta::assert_snapshot!(
        dump(editor.text()),
        @r#""•"[bullet] "alpha\nbeta\n" "•"[bullet] "gamma""#
    );
}

#[test]
fn custom_trigger_symbols() {
    let config = EditorConfig::from_json(r#"{ "mention_symbol": "+", "hashtag_symbol": "$" }"#)
        .unwrap();
    let mut editor = RichEditor::with_config(&config).unwrap();
    type_str(&mut editor, "a +");
    type_str(&mut editor, " $");
    assert_eq!(
        editor.drain_events(),
        vec![
            EditorEvent::MentionStarted { location: 2 },
            EditorEvent::SearchTextChanged(" ".into()),
            EditorEvent::SearchTextChanged(" $".into()),
            EditorEvent::HashtagStarted { location: 4 },
        ]
    );
}

#[test]
fn markdown_round_trip_through_editor() {
    let source = "**bold** *italic* _under_ ~strike~ @ann #tag\n* one\n- two\n1. three\n2. four\n[x] done\n[_] open";
    let mut editor = RichEditor::new();
    editor.load_markdown(source);
    assert!(editor.text().is_partitioned());
    assert_eq!(editor.to_markdown(), source);
}

#[test]
fn deleting_into_a_token_during_a_search_removes_it_whole() {
    init_tracing();
    let mut editor = RichEditor::new();
    editor.append_mention(&Contact { id: 1, name: "amy" }).unwrap();
    type_str(&mut editor, "@");
    assert_eq!(
        editor.drain_events(),
        vec![EditorEvent::MentionStarted { location: 5 }]
    );
    assert!(editor.mention_state().is_active());

    assert!(!editor.before_text_change(1..2, ""));
    assert_eq!(editor.text().text(), " @");
    assert_eq!(editor.take_caret_hint().map(|hint| hint.offset), Some(0));
    assert_eq!(editor.drain_events(), vec![EditorEvent::MentionRemoved { id: 1 }]);
    assert!(editor.mentions().is_empty());
}

#[test]
fn moving_the_caret_out_of_the_query_cancels_the_search() {
    let mut editor = RichEditor::new();
    editor.append_mention(&Contact { id: 1, name: "amy" }).unwrap();
    type_str(&mut editor, "@");
    editor.drain_events();

    editor.selection_changed(2..2);
    assert!(!editor.mention_state().is_active());
    let events = editor.drain_events();
    assert_eq!(events[0], EditorEvent::MentionCancelled);
    assert!(matches!(events[1], EditorEvent::StyleAtSelection(_)));

    assert!(!editor.before_text_change(1..2, ""));
    assert_eq!(editor.text().text(), " @");
    assert_eq!(editor.drain_events(), vec![EditorEvent::MentionRemoved { id: 1 }]);
}

#[test]
fn replacing_part_of_a_token_replaces_all_of_it() {
    let mut editor = RichEditor::new();
    editor.append_mention(&Contact { id: 1, name: "amy" }).unwrap();
    assert!(!editor.before_text_change(1..3, "x"));
    assert_eq!(editor.text().text(), "x ");
    assert_eq!(editor.selection(), Selection::collapsed(1));
    assert_eq!(editor.drain_events(), vec![EditorEvent::MentionRemoved { id: 1 }]);
    insta::assert_snapshot!(dump(editor.text()), @r#""x ""#);
    assert_eq!(editor.text().attributes_at(0).unwrap().0.foreground, None);
}

#[test]
fn adjacent_tokens_for_one_contact_stay_separate() {
    let registry = StyleRegistry::global();
    let bob = Contact { id: 42, name: "bob" };
    let token = mention_attributes(registry.mention_style(), &bob);
    let mut editor = RichEditor::new();
    editor.set_text(AttributedText::from_spans([
        Span::new("@bob", token.clone()),
        Span::new("@bob", token),
    ]));
    assert_eq!(
        editor
            .mentions()
            .into_iter()
            .map(|(mention, range)| (mention.id, range))
            .collect::<Vec<_>>(),
        vec![(42, 0..4), (42, 4..8)]
    );
    insta::assert_snapshot!(dump(editor.text()), @r#""@bob"[@42] "@bob"[@42]"#);

    backspace(&mut editor);
    assert_eq!(editor.text().text(), "@bob");
    assert_eq!(editor.drain_events(), vec![EditorEvent::MentionRemoved { id: 42 }]);
    assert_eq!(editor.mentions().len(), 1);
}

#[test]
fn color_patch_keeps_existing_emphasis() {
    let registry = StyleRegistry::global();
    let mut text = format_document("**loud** *soft* words", &registry);
    let red = Attributes {
        foreground: Some(Color::new("red")),
        ..Default::default()
    };
    assert!(text.update_attributes(&red, 0..9));
    insta::assert_snapshot!(dump(&text), @r#""loud"[b] " " "soft"[i] " words""#);
    assert!(text.runs_in(0..9).all(|run| run.attrs.foreground == red.foreground));
    assert_eq!(text.attributes_at(10).unwrap().0.foreground, None);
}

#[test]
fn checkmarks_toggle_in_place() {
    let mut editor = RichEditor::new();
    editor.load_markdown("[_] milk\n[x] eggs");
    assert_eq!(editor.toggle_checkmark(8), Some(false));
    assert_eq!(editor.toggle_checkmark(2), Some(true));
    assert_eq!(editor.to_markdown(), "[x] milk\n[_] eggs");
    assert_eq!(editor.text().text(), "\u{200B}milk\n\u{200B}eggs");
}
