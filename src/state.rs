use std::fmt;
use tokio::sync::watch;

/// Advertised state of the single service instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceAvailability {
    Offered,
    #[default]
    Withdrawn,
}

/// Notifier loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifierState {
    #[default]
    Blocked,
    Sending,
    Terminated,
}

/// The transport's view of this producer's registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationState {
    Registered,
    #[default]
    Deregistered,
}

impl fmt::Display for ServiceAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceAvailability::Offered => write!(f, "offered"),
            ServiceAvailability::Withdrawn => write!(f, "withdrawn"),
        }
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationState::Registered => write!(f, "registered"),
            RegistrationState::Deregistered => write!(f, "deregistered"),
        }
    }
}

/// A value that waiters can block on.
///
/// Writing the value and waking every waiter happen in one step, so a waiter
/// that subscribes before or after a write always observes it.
#[derive(Debug)]
pub struct StateCell<T> {
    tx: watch::Sender<T>,
}

impl<T> StateCell<T>
where
    T: Copy + PartialEq + Send + Sync,
{
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> T {
        *self.tx.borrow()
    }

    /// Store `value`, waking waiters only when it differs from the current one.
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Wait until the stored value satisfies `predicate` and return it.
    pub async fn wait_until<F>(&self, mut predicate: F) -> T
    where
        F: FnMut(&T) -> bool,
    {
        let mut rx = self.tx.subscribe();
        let result = rx.wait_for(|value| predicate(value)).await.map(|value| *value);
        // the sender lives in `self`, so the channel cannot close here
        result.unwrap_or_else(|_| self.get())
    }
}

impl<T> Default for StateCell<T>
where
    T: Copy + PartialEq + Send + Sync + Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_initial_values() {
        assert_eq!(ServiceAvailability::default(), ServiceAvailability::Withdrawn);
        assert_eq!(NotifierState::default(), NotifierState::Blocked);
        assert_eq!(RegistrationState::default(), RegistrationState::Deregistered);
    }

    #[test]
    fn test_set_reports_changes_only() {
        let cell = StateCell::new(ServiceAvailability::Withdrawn);

        assert!(!cell.set(ServiceAvailability::Withdrawn));
        assert!(cell.set(ServiceAvailability::Offered));
        assert!(!cell.set(ServiceAvailability::Offered));
        assert_eq!(cell.get(), ServiceAvailability::Offered);
    }

    #[tokio::test]
    async fn test_wait_until_returns_immediately_when_satisfied() {
        let cell = StateCell::new(true);
        let value = tokio::time::timeout(Duration::from_millis(100), cell.wait_until(|v| *v))
            .await
            .expect("predicate already holds");
        assert!(value);
    }

    #[tokio::test]
    async fn test_wait_until_wakes_on_set() {
        let cell = Arc::new(StateCell::new(ServiceAvailability::Withdrawn));

        let waiter = {
            let cell = Arc::clone(&cell);
            tokio::spawn(async move {
                cell.wait_until(|a| *a == ServiceAvailability::Offered).await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        cell.set(ServiceAvailability::Offered);

        let observed = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke")
            .unwrap();
        assert_eq!(observed, ServiceAvailability::Offered);
    }

    #[tokio::test]
    async fn test_subscriber_sees_latest_value() {
        let cell = StateCell::new(NotifierState::Blocked);
        let mut rx = cell.subscribe();

        cell.set(NotifierState::Sending);
        cell.set(NotifierState::Terminated);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), NotifierState::Terminated);
    }
}
