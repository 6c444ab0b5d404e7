//! Corpi minimali delle email (oggetto, testo, html)

use super::{InviteEmail, OtpEmail};

pub(crate) struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub(crate) fn invite(email: &InviteEmail) -> RenderedEmail {
    let intro = match &email.inviter_name {
        Some(name) => format!("{} has invited you", name),
        None => "You have been invited".to_string(),
    };
    let subject = format!("You've been invited to join {}", email.garage_name);
    let text = format!(
        "{intro} to join {garage} as a {role}.\n\n\
         Accept your invitation here: {link}\n\n\
         This invitation will expire in 7 days.\n\n\
         If you didn't expect this email, you can safely ignore it.",
        garage = email.garage_name,
        role = email.role,
        link = email.invite_link,
    );
    let html = format!(
        "<p>{intro} to join <strong>{garage}</strong> as a <strong>{role}</strong>.</p>\
         <p><a href=\"{link}\">Accept Invitation</a></p>\
         <p>This invitation will expire in 7 days.</p>",
        garage = email.garage_name,
        role = email.role,
        link = email.invite_link,
    );
    RenderedEmail {
        subject,
        text,
        html,
    }
}

pub(crate) fn otp(email: &OtpEmail) -> RenderedEmail {
    let text = format!(
        "Your verification code is: {code}\n\n\
         Use this code to verify your email and complete your registration for {garage}.\n\n\
         This code expires in 10 minutes.\n\n\
         If you didn't request this code, please ignore this email.",
        code = email.code,
        garage = email.garage_name,
    );
    let html = format!(
        "<p>Use this code to verify your email for <strong>{garage}</strong>.</p>\
         <p style=\"font-size:32px;letter-spacing:8px\"><strong>{code}</strong></p>\
         <p>This code expires in 10 minutes.</p>",
        code = email.code,
        garage = email.garage_name,
    );
    RenderedEmail {
        subject: "Your verification code".to_string(),
        text,
        html,
    }
}
