// Fixture pages of the vendor's compatibility lookup, served through wiremock

#![allow(dead_code)]

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const FORM_PATH: &str = "/Support/compatibility/";
pub const ENTRY_PATH: &str = "/support/authenticator";

pub fn option(value: &str, label: &str, selected: bool) -> String {
    let marker = if selected { r#" selected="selected""# } else { "" };
    format!(r#"<option value="{value}"{marker}>{label}</option>"#)
}

pub fn select(name: &str, options: &[String]) -> String {
    format!(
        r#"<select name="ctl00$Content${name}">{}</select>"#,
        options.concat()
    )
}

pub fn form_page(view_state: &str, selects: &[String], body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><body>
<form id="form1" method="post" action="{FORM_PATH}">
  <input type="hidden" name="__EVENTTARGET" value="">
  <input type="hidden" name="__EVENTARGUMENT" value="">
  <input type="hidden" name="__VIEWSTATE" value="{view_state}">
  <input type="hidden" name="__EVENTVALIDATION" value="ev-{view_state}">
  <input type="text" name="ctl00$search" value="">
  <input type="submit" name="ctl00$BT_search" value="Search">
  {}
  <input type="submit" name="ctl00$Content$BT_searchID" value="Go">
</form>
{body}
</body></html>"#,
        selects.concat()
    )
}

pub fn device(selected: bool) -> String {
    select(
        "Comp_Device",
        &[option("-1", "Select", !selected), option("13", "Motherboard", selected)],
    )
}

pub fn brands(selected: Option<&str>) -> String {
    let options: Vec<String> = [("-1", "Select"), ("12", "ASUS"), ("205", "Supermicro")]
        .iter()
        .map(|(value, label)| option(value, label, selected == Some(*value)))
        .collect();
    select("Comp_Brand", &options)
}

pub fn series(selected: Option<&str>) -> String {
    let options: Vec<String> = [("-1", "Select"), ("7", "X11 Series"), ("8", "H12 Series")]
        .iter()
        .map(|(value, label)| option(value, label, selected == Some(*value)))
        .collect();
    select("Comp_Series", &options)
}

pub fn modules(options: &[(&str, &str, bool)]) -> String {
    let mut rendered = vec![option("-1", "Select", false)];
    rendered.extend(
        options
            .iter()
            .map(|(value, label, selected)| option(value, label, *selected)),
    );
    select("Comp_Module", &rendered)
}

pub fn dram_row(href: &str, name: &str, part: &str, capacity: &str) -> String {
    format!(
        r#"<div class="RowCon Body">
  <div class="Product">
    <h3>{name}</h3>
    <p class="Product_Spec">DDR4 2666 ECC RDIMM 1.2V</p>
    <ul>
      <li class="label-capacity-greenborder">{capacity}</li>
      <li class="Product_PN">{part}</li>
    </ul>
  </div>
  <div class="BTNs"><a href="{href}">Buy</a></div>
</div>"#
    )
}

pub fn results(sections: &[(&str, String)]) -> String {
    let items: String = sections
        .iter()
        .map(|(heading, rows)| format!(r#"<div class="Item"><h4>{heading}</h4>{rows}</div>"#))
        .collect();
    format!(r#"<div id="New_Content_Pa_Result">{items}</div>"#)
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

/// Field `name` of the cascade as it appears in an urlencoded body.
pub fn encoded(name: &str, value: &str) -> String {
    format!("ctl00%24Content%24{name}={value}")
}

/// Mounts the cascade from the entry page down to the module lists: two
/// series, X11 listing one motherboard (1001) and H12 listing none.
pub async fn mount_cascade(server: &MockServer) {
    mount_cascade_with(server, &[]).await;
}

/// Same cascade, with `h12_modules` listed under the H12 series.
pub async fn mount_cascade_with(server: &MockServer, h12_modules: &[(&str, &str, bool)]) {
    Mock::given(method("GET"))
        .and(path(ENTRY_PATH))
        .respond_with(
            html(form_page("vs1", &[device(false), brands(None)], ""))
                .insert_header("set-cookie", "ASP.NET_SessionId=s3ss10n; Path=/"),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(FORM_PATH))
        .and(body_string_contains(encoded("Comp_Brand", "-1")))
        .and(body_string_contains("__VIEWSTATE=vs1"))
        .respond_with(html(form_page(
            "vs2",
            &[device(true), brands(None)],
            "",
        )))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(FORM_PATH))
        .and(body_string_contains(encoded("Comp_Brand", "205")))
        .and(body_string_contains(encoded("Comp_Series", "-1")))
        .and(body_string_contains("__VIEWSTATE=vs2"))
        .respond_with(html(form_page(
            "vs3",
            &[device(true), brands(Some("205")), series(None)],
            "",
        )))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(FORM_PATH))
        .and(body_string_contains(encoded("Comp_Series", "7")))
        .and(body_string_contains("__VIEWSTATE=vs3"))
        .respond_with(html(form_page(
            "vs4",
            &[
                device(true),
                brands(Some("205")),
                series(Some("7")),
                modules(&[("1001", "X11DPi-N Motherboard", false)]),
            ],
            "",
        )))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(FORM_PATH))
        .and(body_string_contains(encoded("Comp_Series", "8")))
        .respond_with(html(form_page(
            "vs5",
            &[
                device(true),
                brands(Some("205")),
                series(Some("8")),
                modules(h12_modules),
            ],
            "",
        )))
        .mount(server)
        .await;
}

/// Mounts the result page of motherboard 1001 with the given DRAM rows next
/// to an unrelated SSD section.
pub async fn mount_result(server: &MockServer, dram_rows: String) {
    let body = results(&[
        (
            "Internal SSDs",
            dram_row("/Product/SSD/1", "SSD230S", "TS256GSSD230S", "256GB"),
        ),
        ("DRAM Modules", dram_rows),
    ]);

    Mock::given(method("GET"))
        .and(path("/Support/compatibility/1001/"))
        .respond_with(html(form_page(
            "vs6",
            &[
                device(true),
                brands(Some("205")),
                series(Some("7")),
                modules(&[("1001", "X11DPi-N Motherboard", true)]),
            ],
            &body,
        )))
        .mount(server)
        .await;
}

pub fn two_dram_rows() -> String {
    dram_row(
        "/Product/Memory/RDIMM/1",
        "DDR4-2666 RDIMM 16GB",
        "TS2GLH72V6B",
        "16GB",
    ) + &dram_row(
        "/Product/Memory/RDIMM/2",
        "DDR4-2666 RDIMM 32GB",
        "TS4GLH72V6B",
        "32GB",
    )
}

pub fn entry_url(server: &MockServer) -> url::Url {
    url::Url::parse(&format!("{}{}", server.uri(), ENTRY_PATH)).unwrap()
}
