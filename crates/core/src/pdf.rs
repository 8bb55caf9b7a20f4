//! Minimal PDF rendering for line-oriented documents.
//!
//! Text is set in the standard Helvetica font with `WinAnsiEncoding`, so
//! no font files need to be embedded. Characters outside that encoding are
//! replaced with `?`.

use foodgram_common::{AppError, AppResult};
use lopdf::{
    Document, Object, ObjectId, Stream, StringFormat,
    content::{Content, Operation},
    dictionary,
};

/// A4 in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;

const TITLE_SIZE: i64 = 20;
const BODY_SIZE: i64 = 12;
const LEADING: i64 = 18;
/// Vertical space the title takes on the first page.
const TITLE_BLOCK: i64 = 40;

const FONT_NAME: &str = "F1";

/// Render a document with a title on the first page followed by one text
/// line per entry, starting new pages as needed.
pub fn render_lines(title: &str, lines: &[String]) -> AppResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { FONT_NAME => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for (index, chunk) in paginate(lines).into_iter().enumerate() {
        let first = index == 0;
        let mut operations = Vec::new();

        let mut y = PAGE_HEIGHT - MARGIN;
        if first {
            push_text(&mut operations, title, TITLE_SIZE, y);
            y -= TITLE_BLOCK;
        }
        for line in chunk {
            push_text(&mut operations, line, BODY_SIZE, y);
            y -= LEADING;
        }

        let content = Content { operations }
            .encode()
            .map_err(|e| AppError::Internal(format!("Failed to encode PDF content: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = add_page(&mut doc, pages_id, content_id);
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    let media_box: Vec<Object> = vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(PAGE_WIDTH),
        Object::Integer(PAGE_HEIGHT),
    ];
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AppError::Internal(format!("Failed to write PDF: {e}")))?;
    Ok(buffer)
}

fn add_page(doc: &mut Document, pages_id: ObjectId, content_id: ObjectId) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    })
}

fn push_text(operations: &mut Vec<Operation>, text: &str, size: i64, y: i64) {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new("Tf", vec![FONT_NAME.into(), size.into()]));
    operations.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
    operations.push(Operation::new(
        "Tj",
        vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
    ));
    operations.push(Operation::new("ET", vec![]));
}

/// How many body lines fit on a page.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn lines_per_page(first: bool) -> usize {
    let top = if first {
        PAGE_HEIGHT - MARGIN - TITLE_BLOCK
    } else {
        PAGE_HEIGHT - MARGIN
    };
    ((top - MARGIN) / LEADING + 1) as usize
}

/// Split lines into pages. There is always at least one page.
fn paginate(lines: &[String]) -> Vec<&[String]> {
    let (first, mut rest) = lines.split_at(lines.len().min(lines_per_page(true)));
    let mut pages = vec![first];
    while !rest.is_empty() {
        let (page, tail) = rest.split_at(rest.len().min(lines_per_page(false)));
        pages.push(page);
        rest = tail;
    }
    pages
}

/// Latin-1 covers the printable part of WinAnsi that matters here.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u8::try_from(u32::from(c)) {
            Ok(b) if b >= 0x20 && b != 0x7f && !(0x80..0xa0).contains(&b) => b,
            _ => b'?',
        })
        .collect()
}
