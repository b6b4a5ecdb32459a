use crate::{
    customer::{flag_as_int, Customer},
    types::{CustomerId, Season, Size},
};
use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Everything sampled for one purchase besides its date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseDetails {
    pub category: String,
    pub item: String,
    /// USD, two decimals, within [20, 100].
    pub amount: f64,
    pub color: String,
    pub size: Size,
    /// 1.0 to 5.0 in half steps.
    pub rating: f64,
    pub shipping_type: String,
    pub payment_method: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekdayInfo {
    /// 1 = Monday, 7 = Sunday.
    pub number: u32,
    pub name: &'static str,
    pub weekend: bool,
}

impl WeekdayInfo {
    pub fn from_date(date: NaiveDate) -> Self {
        let number = date.weekday().number_from_monday();
        Self { number, name: Self::name_of(number), weekend: number >= 6 }
    }

    pub fn name_of(number: u32) -> &'static str {
        match number {
            1 => "Monday",
            2 => "Tuesday",
            3 => "Wednesday",
            4 => "Thursday",
            5 => "Friday",
            6 => "Saturday",
            _ => "Sunday",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordOrigin {
    Past,
    Future,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    pub customer_id: CustomerId,
    pub subscribed: bool,
    pub date: NaiveDate,
    pub season: Season,
    pub details: PurchaseDetails,
    pub promo_used: bool,
    pub weekday: Option<WeekdayInfo>,
    pub origin: RecordOrigin,
}

impl PurchaseRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// Roster columns dropped from the purchase log.
pub const DROPPED_COLUMNS: [&str; 2] = ["Discount Applied", "Frequency of Purchases"];

/// One output line: the customer's roster columns followed by the
/// purchase columns.
#[derive(Debug, Serialize)]
pub struct OutputRow<'a> {
    #[serde(rename = "Customer ID")]
    pub customer_id: CustomerId,
    #[serde(rename = "Gender")]
    pub gender: Option<&'a str>,
    #[serde(rename = "Age")]
    pub age: u32,
    #[serde(rename = "Subscription Status", serialize_with = "flag_as_int")]
    pub subscribed: bool,
    #[serde(rename = "Previous Purchases")]
    pub previous_purchases: u32,
    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
    #[serde(rename = "Item Purchased")]
    pub item: &'a str,
    #[serde(rename = "Category")]
    pub category: &'a str,
    #[serde(rename = "Purchase Amount (USD)")]
    pub amount: f64,
    #[serde(rename = "Color")]
    pub color: &'a str,
    #[serde(rename = "Size")]
    pub size: Size,
    #[serde(rename = "Season")]
    pub season: Season,
    #[serde(rename = "Review Rating")]
    pub rating: f64,
    #[serde(rename = "Shipping Type")]
    pub shipping_type: &'a str,
    #[serde(rename = "Payment Method")]
    pub payment_method: &'a str,
    #[serde(rename = "Purchase Date", serialize_with = "iso_date")]
    pub date: NaiveDate,
    #[serde(rename = "Promo Code Used", serialize_with = "flag_as_int")]
    pub promo_used: bool,
    #[serde(rename = "WeekdayNum")]
    pub weekday_num: u32,
    #[serde(rename = "Weekday")]
    pub weekday: &'static str,
    #[serde(rename = "Weekend", serialize_with = "flag_as_int")]
    pub weekend: bool,
}

impl<'a> OutputRow<'a> {
    pub fn new(customer: &'a Customer, record: &'a PurchaseRecord) -> Self {
        let passthrough = customer
            .extra
            .iter()
            .filter(|(k, _)| !DROPPED_COLUMNS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let weekday = record.weekday.unwrap_or_else(|| WeekdayInfo::from_date(record.date));
        let d = &record.details;
        Self {
            customer_id: customer.id,
            gender: customer.gender_label.as_deref(),
            age: customer.age,
            subscribed: customer.subscribed,
            previous_purchases: customer.previous_purchases,
            passthrough,
            item: &d.item,
            category: &d.category,
            amount: d.amount,
            color: &d.color,
            size: d.size,
            season: record.season,
            rating: d.rating,
            shipping_type: &d.shipping_type,
            payment_method: &d.payment_method,
            date: record.date,
            promo_used: record.promo_used,
            weekday_num: weekday.number,
            weekday: weekday.name,
            weekend: weekday.weekend,
        }
    }
}

fn iso_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Gender;

    #[test]
    fn weekday_numbering_is_monday_first() {
        let sat = WeekdayInfo::from_date(NaiveDate::from_ymd_opt(2023, 12, 23).unwrap());
        assert_eq!((sat.number, sat.name, sat.weekend), (6, "Saturday", true));
        let mon = WeekdayInfo::from_date(NaiveDate::from_ymd_opt(2023, 12, 25).unwrap());
        assert_eq!((mon.number, mon.weekend), (1, false));
    }

    fn sandals(customer_id: CustomerId) -> PurchaseRecord {
        PurchaseRecord {
            customer_id,
            subscribed: true,
            date: NaiveDate::from_ymd_opt(2023, 7, 4).unwrap(),
            season: Season::Summer,
            details: PurchaseDetails {
                category: "Footwear".into(),
                item: "Sandals".into(),
                amount: 42.5,
                color: "White".into(),
                size: Size::M,
                rating: 4.5,
                shipping_type: "Standard".into(),
                payment_method: "Cash".into(),
            },
            promo_used: false,
            weekday: None,
            origin: RecordOrigin::Past,
        }
    }

    #[test]
    fn output_row_drops_discount_and_frequency() {
        let mut customer = Customer::new(3, Some(Gender::Male), 30, true, 1);
        customer.frequency = Some("Weekly".into());
        customer.extra.insert("Discount Applied".into(), Value::from("Yes"));
        customer.extra.insert("Location".into(), Value::from("Texas"));
        let record = sandals(3);
        let json = serde_json::to_value(OutputRow::new(&customer, &record)).unwrap();
        assert!(json.get("Discount Applied").is_none());
        assert!(json.get("Frequency of Purchases").is_none());
        assert_eq!(json["Gender"], Value::from("Male"));
        assert_eq!(json["Location"], Value::from("Texas"));
        assert_eq!(json["Purchase Date"], Value::from("2023-07-04"));
        assert_eq!(json["Subscription Status"], Value::from(1));
        assert_eq!(json["WeekdayNum"], Value::from(2));
    }

    #[test]
    fn unrecognized_gender_is_written_back_verbatim() {
        let customer: Customer = serde_json::from_str(
            r#"{"Customer ID": 9, "Gender": "Non-binary", "Age": 27, "Subscription Status": "No", "Previous Purchases": 4}"#,
        )
        .unwrap();
        assert_eq!(customer.gender, None);
        let json = serde_json::to_value(OutputRow::new(&customer, &sandals(9))).unwrap();
        assert_eq!(json["Gender"], Value::from("Non-binary"));

        let blank: Customer = serde_json::from_str(
            r#"{"Customer ID": 10, "Age": 27, "Subscription Status": 1, "Previous Purchases": 4}"#,
        )
        .unwrap();
        let json = serde_json::to_value(OutputRow::new(&blank, &sandals(10))).unwrap();
        assert_eq!(json["Gender"], Value::Null);
    }

    #[test]
    fn roster_columns_keep_their_order() {
        let customer: Customer = serde_json::from_str(
            r#"{"Customer ID": 5, "Gender": "Female", "Age": 52, "Location": "Maine",
                "Discount Applied": "No", "Age Group": "45-54", "Subscription Status": 0,
                "Previous Purchases": 3}"#,
        )
        .unwrap();
        let line = serde_json::to_string(&OutputRow::new(&customer, &sandals(5))).unwrap();
        let at = |col: &str| line.find(&format!("\"{col}\"")).unwrap();
        assert!(at("Previous Purchases") < at("Location"));
        assert!(at("Location") < at("Age Group"));
        assert!(at("Age Group") < at("Item Purchased"));
    }
}
