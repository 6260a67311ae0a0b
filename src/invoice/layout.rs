use crate::database::models::{fmt_money, Payment, RecordStatus};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 15.0;

pub const TITLE: &str = "Jasmin D - Payment Invoice";
pub const CLOSING_LINE: &str = "Thank you for your payment!";

const GREEN: Rgb8 = Rgb8(0x4C, 0xAF, 0x50);
const RED: Rgb8 = Rgb8(0xE5, 0x39, 0x35);
const HEADING_GREY: Rgb8 = Rgb8(0x3B, 0x3B, 0x3B);
const VALUE_GREY: Rgb8 = Rgb8(0x33, 0x33, 0x33);
const NOTE_GREY: Rgb8 = Rgb8(0x55, 0x55, 0x55);
const DIVIDER_GREY: Rgb8 = Rgb8(0xE0, 0xE0, 0xE0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb8(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size_pt: f32,
    pub face: FontFace,
    pub color: Rgb8,
    pub underline: bool,
}

impl TextStyle {
    fn header() -> Self {
        Self { size_pt: 22.0, face: FontFace::Bold, color: GREEN, underline: false }
    }
    fn subheader() -> Self {
        Self { size_pt: 16.0, face: FontFace::Bold, color: HEADING_GREY, underline: true }
    }
    fn detail_label() -> Self {
        Self { size_pt: 14.0, face: FontFace::Bold, color: GREEN, underline: false }
    }
    fn detail_value() -> Self {
        Self { size_pt: 14.0, face: FontFace::Regular, color: VALUE_GREY, underline: false }
    }
    fn description() -> Self {
        Self { size_pt: 12.0, face: FontFace::Italic, color: NOTE_GREY, underline: false }
    }
    fn footer() -> Self {
        Self { size_pt: 12.0, face: FontFace::Italic, color: GREEN, underline: false }
    }
}

/// One drawable item. `y_mm` is the baseline measured from the top edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        text: String,
        x_mm: f32,
        y_mm: f32,
        align: TextAlign,
        style: TextStyle,
    },
    Rule {
        x1_mm: f32,
        x2_mm: f32,
        y_mm: f32,
        thickness_pt: f32,
        color: Rgb8,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLayout {
    pub title: String,
    pub elements: Vec<Element>,
}

impl InvoiceLayout {
    pub fn for_payment(payment: &Payment) -> Self {
        let left = MARGIN_MM;
        let right = PAGE_WIDTH_MM - MARGIN_MM;
        let center = PAGE_WIDTH_MM / 2.0;
        let mut b = Builder::default();

        let mut y = 30.0;
        b.text(TITLE, center, y, TextAlign::Center, TextStyle::header());

        y += 17.0;
        b.text("Invoice Details", left, y, TextAlign::Left, TextStyle::subheader());

        y += 13.0;
        b.text(
            format!("Apartment Number: {}", payment.apartment),
            left,
            y,
            TextAlign::Left,
            TextStyle::detail_label(),
        );
        b.text(
            format!("Date: {}", payment.date.format("%Y-%m-%d")),
            right,
            y,
            TextAlign::Right,
            TextStyle::detail_value(),
        );

        y += 10.0;
        b.text(
            format!("Amount: {}", fmt_money(&payment.amount)),
            left,
            y,
            TextAlign::Left,
            TextStyle::detail_label(),
        );
        b.text(
            format!("Status: {}", payment.status.label()),
            right,
            y,
            TextAlign::Right,
            TextStyle {
                color: status_color(payment.status),
                ..TextStyle::detail_value()
            },
        );

        y += 18.0;
        b.text("Description:", left, y, TextAlign::Left, TextStyle::subheader());

        y += 9.0;
        b.text(
            format!("Payment for - {}", payment.description),
            left,
            y,
            TextAlign::Left,
            TextStyle::description(),
        );

        y += 12.0;
        b.elements.push(Element::Rule {
            x1_mm: left,
            x2_mm: right,
            y_mm: y,
            thickness_pt: 1.0,
            color: DIVIDER_GREY,
        });

        y += 10.0;
        b.text(CLOSING_LINE, center, y, TextAlign::Center, TextStyle::footer());

        InvoiceLayout {
            title: format!("Invoice {} {}", payment.apartment, payment.description),
            elements: b.elements,
        }
    }

    /// Every text run in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            Element::Rule { .. } => None,
        })
    }
}

pub fn status_color(status: RecordStatus) -> Rgb8 {
    match status {
        RecordStatus::Paid => GREEN,
        RecordStatus::Unpaid => RED,
    }
}

#[derive(Default)]
struct Builder {
    elements: Vec<Element>,
}

impl Builder {
    fn text(&mut self, text: impl Into<String>, x_mm: f32, y_mm: f32, align: TextAlign, style: TextStyle) {
        self.elements.push(Element::Text {
            text: text.into(),
            x_mm,
            y_mm,
            align,
            style,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn payment(status: RecordStatus) -> Payment {
        Payment {
            id: 3,
            apartment: "204".into(),
            amount: Decimal::new(12550, 2),
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            description: "May-2024".into(),
            status,
        }
    }

    fn style_of<'a>(layout: &'a InvoiceLayout, wanted: &str) -> &'a TextStyle {
        layout
            .elements
            .iter()
            .find_map(|e| match e {
                Element::Text { text, style, .. } if text == wanted => Some(style),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn sections_appear_in_reading_order() {
        let layout = InvoiceLayout::for_payment(&payment(RecordStatus::Paid));
        let texts: Vec<&str> = layout.texts().collect();
        assert_eq!(
            texts,
            vec![
                TITLE,
                "Invoice Details",
                "Apartment Number: 204",
                "Date: 2024-05-02",
                "Amount: 125.50",
                "Status: Paid",
                "Description:",
                "Payment for - May-2024",
                CLOSING_LINE,
            ]
        );
        assert_eq!(
            layout.elements.iter().filter(|e| matches!(e, Element::Rule { .. })).count(),
            1
        );
    }

    #[test]
    fn paired_details_share_a_line() {
        let layout = InvoiceLayout::for_payment(&payment(RecordStatus::Paid));
        let y_of = |wanted: &str| {
            layout
                .elements
                .iter()
                .find_map(|e| match e {
                    Element::Text { text, y_mm, .. } if text == wanted => Some(*y_mm),
                    _ => None,
                })
                .unwrap()
        };
        assert_eq!(y_of("Apartment Number: 204"), y_of("Date: 2024-05-02"));
        assert_eq!(y_of("Amount: 125.50"), y_of("Status: Paid"));
    }

    #[test]
    fn status_colour_distinguishes_paid_from_unpaid() {
        let paid = InvoiceLayout::for_payment(&payment(RecordStatus::Paid));
        let unpaid = InvoiceLayout::for_payment(&payment(RecordStatus::Unpaid));
        let paid_color = style_of(&paid, "Status: Paid").color;
        let unpaid_color = style_of(&unpaid, "Status: Not Paid").color;
        assert_ne!(paid_color, unpaid_color);
    }

    #[test]
    fn layout_is_a_function_of_the_record() {
        let p = payment(RecordStatus::Unpaid);
        assert_eq!(InvoiceLayout::for_payment(&p), InvoiceLayout::for_payment(&p.clone()));
    }
}
