// Round trips between attributed text and HTML.

use richnote_core::markdown::format_document;
use richnote_core::mention::mention_attributes;
use richnote_core::{AttributedText, Attributes, Color, ListItem, Mentionable, Span, StyleRegistry};
use richnote_html::{HtmlErrorKind, from_html, to_html};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone)]
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

fn no_mentions(_: &[i64]) -> Vec<Contact> {
    Vec::new()
}

#[test]
fn simple_bullet_list() {
    init_tracing();
    let html = "<ul><li>A</li><li>B</li></ul>";
    let text = from_html(html, no_mentions).unwrap();
    assert_eq!(text.text(), "•A\n•B");
    assert_eq!(text.list_item_at(0), Some(ListItem::BULLET));
    assert_eq!(text.list_item_at(3), Some(ListItem::BULLET));
    assert_eq!(to_html(&text), html);
}

#[test]
fn styled_document_round_trip() {
    init_tracing();
    let registry = StyleRegistry::global();
    let doc = format_document(
        "**bold** *italic* _under_ ~strike~\n* one\n- two\n1. three\n2. four\n[x] done\n\nend",
        &registry,
    );

    let html = to_html(&doc);
    insta::assert_snapshot!(
        html,
        @r#"<b>bold</b> <i>italic</i> <u>under</u> <del>strike</del><br><ul><li>one</li><li data-type="dashed">two</li></ul><br><ol><li>three</li><li>four</li></ol><br><ul><li data-type="checkmark(true)">done</li></ul><br><br>end"#
    );

    let decoded = from_html(&html, no_mentions).unwrap();
    assert!(decoded.is_partitioned());
    assert_eq!(decoded.to_spans(), doc.to_spans());
    assert_eq!(to_html(&decoded), html);
}

#[test]
fn ordered_start_and_colors() {
    let colored = Attributes {
        foreground: Some(Color::new("#ff0000")),
        background: Some(Color::new("rgb(0, 0, 255)")),
        ..Attributes::bold()
    };
    let mut spans = vec![Span::new("hot", colored), Span::plain("\n")];
    spans.extend(ListItem::ordered(7).marker_spans(&Attributes::default()));
    spans.push(Span::plain("seven"));
    let doc: AttributedText = AttributedText::from_spans(spans);

    let html = to_html(&doc);
    insta::assert_snapshot!(
        html,
        @r#"<span style="color: #ff0000; background-color: rgb(0, 0, 255)"><b>hot</b></span><br><ol start="7"><li>seven</li></ol>"#
    );

    let decoded = from_html(&html, no_mentions).unwrap();
    assert_eq!(decoded.to_spans(), doc.to_spans());
}

#[test]
fn mentions_are_recovered_through_the_resolver() {
    init_tracing();
    let registry = StyleRegistry::global();
    let ann = Contact { id: 7, name: "ann" };
    let doc: AttributedText = AttributedText::from_spans([
        Span::plain("ping "),
        Span::new("@ann", mention_attributes(registry.mention_style(), &ann)),
        Span::plain(" <now> & then"),
    ]);

    let html = to_html(&doc);
    insta::assert_snapshot!(
        html,
        @r#"ping <span data-id="7" class="mention">@ann</span> &lt;now&gt; &amp; then"#
    );

    let mut requested = Vec::new();
    let decoded = from_html(&html, |ids| {
        requested.extend_from_slice(ids);
        vec![ann.clone()]
    })
    .unwrap();
    assert_eq!(requested, vec![7]);
    assert_eq!(decoded.to_spans(), doc.to_spans());

    let (mention, range) = decoded.mention_at(6).unwrap();
    assert_eq!(mention.id, 7);
    assert_eq!(mention.display, "@ann");
    assert_eq!(range, 5..9);
}

#[test]
fn pasted_markup_variants() {
    let html = "<div><strong>Title</strong></div><p>Body with <em>emphasis</em>&nbsp;and <font color=\"green\">ink</font>.</p>";
    let text = from_html(html, no_mentions).unwrap();
    assert_eq!(text.text(), "Title\nBody with emphasis\u{a0}and ink.");
    assert!(text.attributes_at(0).unwrap().0.is_bold());
    assert!(text.attributes_at(16).unwrap().0.is_italic());
    let (ink, range) = text.attributes_at(29).unwrap();
    assert_eq!(ink.foreground, Some(Color::new("green")));
    assert_eq!(range, 29..32);
}

#[test]
fn malformed_markup_is_an_error() {
    let err = from_html("fine <b>bold</b> <i class=\"x", no_mentions).unwrap_err();
    assert_eq!(err.kind(), HtmlErrorKind::UnterminatedAttribute);
    assert_eq!(err.offset(), 26);

    let err = from_html("<!-- never closed", no_mentions).unwrap_err();
    assert_eq!(err.kind(), HtmlErrorKind::UnterminatedComment);
}
