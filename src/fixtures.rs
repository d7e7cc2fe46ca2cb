//! Markup builders shared by the unit tests.

pub const CATALOG_JSON: &str = r#"{"730":{"111_0":{"name":"AK-47 | Redline","type":"Classified Rifle","icon_url":"abc","tradable":1,"marketable":1}},"440":{"222_11":{"name":"Mann Co. Supply Crate Key","type":"Tool","tradable":1,"marketable":1}},"753":{"333_0":{"name":"Gems","type":"Steam Gems","tradable":1,"marketable":0}}}"#;

pub const PROFILE: &str = "https://steamcommunity.com/profiles/76561197960287930/";

pub struct ItemFixture {
    app_id: String,
    class_id: String,
    instance_id: String,
    context_id: String,
    amount: String,
    href: Option<String>,
}

impl ItemFixture {
    pub fn new(app_id: &str, class_id: &str, instance_id: &str) -> Self {
        Self {
            app_id: app_id.to_owned(),
            class_id: class_id.to_owned(),
            instance_id: instance_id.to_owned(),
            context_id: "2".to_owned(),
            amount: "1".to_owned(),
            href: None,
        }
    }

    pub fn amount(mut self, amount: &str) -> Self {
        self.amount = amount.to_owned();
        self
    }

    pub fn link(mut self, fragment: &str) -> Self {
        self.href = Some(format!("https://steamcommunity.com/id/me/inventory/{fragment}"));
        self
    }

    pub fn href(mut self, href: &str) -> Self {
        self.href = Some(href.to_owned());
        self
    }

    fn render(&self, row_id: &str, idx: usize) -> String {
        let href = self
            .href
            .as_ref()
            .map(|h| format!(r#" href="{h}""#))
            .unwrap_or_default();
        format!(
            r#"<a class="history_item economy_item_hoverable" id="history{row_id}_{idx}"{href} data-appid="{}" data-contextid="{}" data-classid="{}" data-instanceid="{}" data-amount="{}"><span class="history_item_name">item</span></a>"#,
            self.app_id, self.context_id, self.class_id, self.instance_id, self.amount
        )
    }
}

fn items_block(sign: &str, items: &[ItemFixture], row_id: &str, offset: usize) -> String {
    if items.is_empty() {
        return String::new();
    }
    let rendered: String = items
        .iter()
        .enumerate()
        .map(|(i, item)| item.render(row_id, offset + i))
        .collect();
    let class = if sign == "+" { "plus" } else { "minus" };
    format!(
        r#"<div class="tradehistory_items tradehistory_items_{class}"><div class="tradehistory_items_plusminus">{sign}</div><div class="tradehistory_items_group">{rendered}</div></div>"#
    )
}

pub fn trade_row(
    id: &str,
    date: &str,
    clock: &str,
    description: &str,
    plus: &[ItemFixture],
    minus: &[ItemFixture],
) -> String {
    format!(
        r#"<div class="tradehistoryrow">
  <div class="tradehistory_date">{date}<div class="tradehistory_timestamp">{clock}</div></div>
  <div class="tradehistory_content" id="{id}_content">
    <div class="tradehistory_event_description">{description}</div>
    {}{}
  </div>
</div>"#,
        items_block("+", plus, id, 0),
        items_block("-", minus, id, plus.len()),
    )
}

pub fn trade_page(rows: &[String], catalog: &str, cursor: Option<&str>, paging: &str) -> String {
    let cursor = cursor
        .map(|c| format!("var g_historyCursor = {c};\n"))
        .unwrap_or_default();
    format!(
        r#"<html><head><script type="text/javascript">
var g_rgDescriptions = {catalog};
{cursor}</script></head>
<body>
<div class="inventory_history_pagingrow">{paging}<span class="pagingrow_label">Showing</span></div>
<div id="inventory_history_table">{}</div>
</body></html>"#,
        rows.join("\n")
    )
}
