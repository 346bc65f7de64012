use time::{macros::format_description, Date};

use super::ReservationNotice;

pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[day]/[month]/[year]"))
        .unwrap_or_else(|_| date.to_string())
}

fn layout(title: &str, body: &str, frontend_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">{title}</h2>
        {body}
        <p style="margin: 30px 0;">
            <a href="{frontend_url}"
               style="display: inline-block; background-color: #2563eb; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">
                Open SitMe
            </a>
        </p>
    </div>
</body>
</html>"#
    )
}

pub fn registration(username: &str, frontend_url: &str) -> RenderedEmail {
    let body = format!("<p>Hi {username}, your SitMe account is ready. You can now book rooms and tables.</p>");
    RenderedEmail {
        subject: "Successful registration | SitMe App".into(),
        html: layout("Welcome to SitMe", &body, frontend_url),
    }
}

fn reservation_body(n: &ReservationNotice, verb: &str) -> String {
    format!(
        "<p>Hi {}, your reservation has been {verb}.</p>\
         <ul><li>Space: {}</li><li>Date: {}</li><li>Time slot: {}</li></ul>",
        n.username,
        n.space_name,
        format_date(n.date),
        n.slot.as_str(),
    )
}

pub fn reservation_confirmed(n: &ReservationNotice, frontend_url: &str) -> RenderedEmail {
    RenderedEmail {
        subject: "Reservation confirmed | SitMe App".into(),
        html: layout("Reservation confirmed", &reservation_body(n, "confirmed"), frontend_url),
    }
}

pub fn reservation_cancelled(n: &ReservationNotice, frontend_url: &str) -> RenderedEmail {
    RenderedEmail {
        subject: "Reservation cancelled | SitMe App".into(),
        html: layout("Reservation cancelled", &reservation_body(n, "cancelled"), frontend_url),
    }
}
