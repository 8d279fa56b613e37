use std::fmt;
use std::rc::Rc;

pub type ReloadFn = dyn Fn();

/// What the session does when the wallet switches chains.
#[derive(Clone, Default)]
pub enum ChainChangePolicy {
    /// Drop network and signer, re-derive both from the provider in place.
    #[default]
    Refresh,
    /// Run the hook (a page reload in the browser) and reset to `Disconnected`.
    Reload(Rc<ReloadFn>),
}

impl ChainChangePolicy {
    pub fn reload(hook: impl Fn() + 'static) -> Self {
        ChainChangePolicy::Reload(Rc::new(hook))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainChangePolicy::Refresh => "refresh",
            ChainChangePolicy::Reload(_) => "reload",
        }
    }
}

impl fmt::Debug for ChainChangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
