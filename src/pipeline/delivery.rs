//! Notification stage: send each generated certificate to its recipient.
//!
//! Runs after generation, never inside it. Each send is independent; a
//! failed delivery is recorded and the loop moves on.

use crate::config::Announcement;
use crate::notifier::{Notifier, OutgoingCertificate};
use crate::pipeline::events::{EventSink, PipelineEvent};
use crate::pipeline::types::{BatchResult, DeliveryFailure, DeliveryReport};

/// Send every certificate that has an email address, in result order.
pub async fn deliver_certificates(
    notifier: &dyn Notifier,
    result: &BatchResult,
    announcement: &Announcement,
    sink: &dyn EventSink,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    if !result.email_configured {
        report.skipped = result.certificates.len();
        return report;
    }

    for cert in &result.certificates {
        let Some(recipient) = cert.email.as_deref() else {
            report.skipped += 1;
            continue;
        };

        let message = OutgoingCertificate {
            recipient: recipient.to_string(),
            subject: announcement.subject.clone(),
            body: announcement.body.clone(),
            attachment: cert.artifact.file_path.clone(),
        };

        match notifier.send(&message).await {
            Ok(()) => {
                sink.emit(PipelineEvent::NotificationSent {
                    recipient: recipient.to_string(),
                    name: cert.name.clone(),
                });
                report.sent.push(recipient.to_string());
            }
            Err(e) => {
                sink.emit(PipelineEvent::NotificationFailed {
                    recipient: recipient.to_string(),
                    name: cert.name.clone(),
                    reason: e.to_string(),
                });
                report.failed.push(DeliveryFailure {
                    recipient: recipient.to_string(),
                    name: cert.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}
