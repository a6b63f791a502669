use html_escape::encode_text;

use crate::constants::auth::RESET_CODE_TTL_MINUTES;

/// HTML body of the password-recovery email.
#[must_use]
pub fn reset_code_email(full_name: &str, code: &str) -> String {
    let name = encode_text(full_name);

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; background: #f4f6fb; padding: 20px; border-radius: 15px;">
  <div style="background: white; padding: 30px; border-radius: 10px; text-align: center;">
    <h1 style="color: #4A90E2; margin-bottom: 20px;">FonoKids - Recuperar Contraseña</h1>
    <p style="font-size: 18px; color: #333;">¡Hola <strong>{name}</strong>!</p>
    <p style="color: #666; margin-bottom: 30px;">Recibimos una solicitud para restablecer tu contraseña. Usa el siguiente código:</p>
    <div style="background: #f0f8ff; border: 2px solid #4A90E2; border-radius: 10px; padding: 20px; margin: 20px 0;">
      <h2 style="color: #4A90E2; font-size: 32px; margin: 0; letter-spacing: 5px;">{code}</h2>
    </div>
    <p style="color: #e74c3c; font-weight: bold;">Este código expira en {RESET_CODE_TTL_MINUTES} minutos</p>
    <p style="color: #666; font-size: 14px; margin-top: 30px;">Si no solicitaste este cambio, ignora este mensaje.</p>
    <p style="color: #999; font-size: 12px; margin-top: 30px;">FonoKids - Sistema de Fonoaudiología</p>
  </div>
</div>"#
    )
}

/// Plain-text alternative for clients that do not render HTML.
#[must_use]
pub fn plain_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 80).unwrap_or_else(|e| {
        tracing::debug!("Falling back to raw body for plain-text part: {e}");
        html.to_string()
    })
}
