use std::sync::atomic::{AtomicU64, Ordering};

/// Global request counters shared between handlers and the /metrics endpoint.
#[derive(Default)]
pub struct AppMetrics {
    pub signups_total: AtomicU64,
    pub logins_total: AtomicU64,
    pub login_failures_total: AtomicU64,
    pub notes_created: AtomicU64,
    pub notes_updated: AtomicU64,
    pub notes_deleted: AtomicU64,
}

impl AppMetrics {
    pub fn inc_signup(&self) {
        self.signups_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_login(&self) {
        self.logins_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_login_failure(&self) {
        self.login_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_note_created(&self) {
        self.notes_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_note_updated(&self) {
        self.notes_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_note_deleted(&self) {
        self.notes_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Serialize to Prometheus text exposition format.
    pub fn to_prometheus_text(&self) -> String {
        let signups = self.signups_total.load(Ordering::Relaxed);
        let logins = self.logins_total.load(Ordering::Relaxed);
        let login_failures = self.login_failures_total.load(Ordering::Relaxed);
        let created = self.notes_created.load(Ordering::Relaxed);
        let updated = self.notes_updated.load(Ordering::Relaxed);
        let deleted = self.notes_deleted.load(Ordering::Relaxed);

        format!(
            "# HELP jotter_signups_total Accounts created\n\
             # TYPE jotter_signups_total counter\n\
             jotter_signups_total {signups}\n\
             # HELP jotter_logins_total Login attempts\n\
             # TYPE jotter_logins_total counter\n\
             jotter_logins_total{{status=\"ok\"}} {logins}\n\
             jotter_logins_total{{status=\"failed\"}} {login_failures}\n\
             # HELP jotter_notes_mutations_total Note mutations\n\
             # TYPE jotter_notes_mutations_total counter\n\
             jotter_notes_mutations_total{{op=\"create\"}} {created}\n\
             jotter_notes_mutations_total{{op=\"update\"}} {updated}\n\
             jotter_notes_mutations_total{{op=\"delete\"}} {deleted}\n"
        )
    }
}
