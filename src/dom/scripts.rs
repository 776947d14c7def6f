//! Fixed page scripts.
//!
//! Every script the engine sends to the browser is a constant: parameters are
//! passed as JSON arguments through `BrowserDriver::evaluate`, never spliced
//! into the source. None of them may use `eval`, `Function()`,
//! `document.write`, `fetch` or touch cookies; `validate_script` enforces
//! that list and runs over the constants in a test.

/// Collects the whole-page snapshot: selected form, candidate elements with
/// attributes and structural context primitives, label[for] index, dt/dd and
/// th/td header indexes and visible text nodes.
///
/// Args: `{ "formBounds": {x,y,width,height} | null }` restricts the indexes
/// and text-node sweep to the given area.
pub const COLLECT_SNAPSHOT: &str = r#"
(args) => {
  const formArea = args && args.formBounds ? args.formBounds : null;
  const inArea = (r) => {
    if (!formArea) return true;
    const ih = Math.min(r.right, formArea.x + formArea.width) - Math.max(r.left, formArea.x);
    const iv = Math.min(r.bottom, formArea.y + formArea.height) - Math.max(r.top, formArea.y);
    return ih > 0 && iv > 0;
  };
  const esc = (s) => String(s).replace(/\\/g, '\\\\').replace(/"/g, '\\"');
  const selectorFor = (el) => {
    const id = el.getAttribute('id');
    if (id) return '[id="' + esc(id) + '"]';
    const tag = el.tagName.toLowerCase();
    const name = el.getAttribute('name');
    const type = el.getAttribute('type');
    if (name) {
      let sel = tag + '[name="' + esc(name) + '"]';
      if (type) sel += '[type="' + esc(type) + '"]';
      return sel;
    }
    if (type) return tag + '[type="' + esc(type) + '"]';
    return tag;
  };
  const textOf = (node) => ((node && (node.innerText || node.textContent)) || '').trim();
  const visibleLite = (el) => {
    const r = el.getBoundingClientRect();
    if (r.width === 0 || r.height === 0) return false;
    const st = window.getComputedStyle(el);
    return st.display !== 'none' && st.visibility !== 'hidden';
  };

  const forms = Array.from(document.querySelectorAll('form'));
  let form = null, best = -1;
  for (const f of forms) {
    const fields = f.querySelectorAll('input:not([type=hidden]), textarea, select').length;
    if (fields > best && visibleLite(f)) { best = fields; form = f; }
  }
  const root = form || document;
  const formRect = form ? form.getBoundingClientRect() : null;

  const siblingTexts = (el, backwards, max) => {
    const out = [];
    let sib = backwards ? el.previousElementSibling : el.nextElementSibling;
    let count = 0;
    while (sib && count < max) {
      const tag = sib.tagName.toLowerCase();
      const isInput = ['input', 'textarea', 'select'].includes(tag);
      const text = textOf(sib);
      if (text && !isInput && text.length < 200) {
        out.push({ text, tag, position: count });
      }
      sib = backwards ? sib.previousElementSibling : sib.nextElementSibling;
      count++;
    }
    return out;
  };

  const liLabel = (el) => {
    const li = el.closest('li');
    if (!li || !li.closest('ul')) return null;
    const isIndicator = (tx) => {
      const s = (tx || '').trim();
      if (!s) return true;
      const inds = ['必須', '※必須', '任意', '(必須)', '（必須）', '(任意)', '（任意）'];
      return inds.some((i) => s.indexOf(i) !== -1) || s.replace(/\s+/g, '').length <= 2;
    };
    let prev = li.previousElementSibling;
    while (prev) {
      if (prev.tagName && prev.tagName.toLowerCase() === 'li') {
        const cls = (prev.getAttribute('class') || '').toLowerCase();
        if (/li_left/.test(cls)) {
          const t = textOf(prev);
          if (t) return t;
        }
      }
      prev = prev.previousElementSibling;
    }
    prev = li.previousElementSibling;
    while (prev) {
      if (prev.tagName && prev.tagName.toLowerCase() === 'li') {
        const text = textOf(prev);
        const hasInputs = prev.querySelector('input,textarea,select,button') !== null;
        if (!hasInputs && text && !isIndicator(text)) return text;
      }
      prev = prev.previousElementSibling;
    }
    return null;
  };

  const parentOwnText = (el) => {
    const p = el.parentElement;
    if (!p) return null;
    let text = textOf(p);
    for (const child of p.children) {
      const ct = textOf(child);
      if (ct) text = text.replace(ct, '').trim();
    }
    return text || null;
  };

  const legendText = (el) => {
    const gp = el.parentElement && el.parentElement.parentElement;
    if (!gp) return null;
    const tag = gp.tagName.toLowerCase();
    if (!['fieldset', 'div', 'section'].includes(tag)) return null;
    const head = gp.querySelector('legend, h1, h2, h3, h4, h5, h6');
    return head ? textOf(head) : null;
  };

  const dtWalk = (el) => {
    let p = el.parentElement;
    while (p && p !== document.body && p.tagName.toLowerCase() !== 'dd') p = p.parentElement;
    if (!p || p === document.body) return { text: null, cls: '' };
    let dt = p.previousElementSibling;
    while (dt && dt.tagName.toLowerCase() !== 'dt') dt = dt.previousElementSibling;
    if (!dt) return { text: null, cls: '' };
    return { text: textOf(dt) || null, cls: (dt.getAttribute('class') || '').toLowerCase() };
  };

  const thWalk = (el) => {
    let td = el.parentElement;
    while (td && td !== document.body && td.tagName.toLowerCase() !== 'td') td = td.parentElement;
    if (!td || td === document.body) return { text: null, cls: '', left: null };
    const tr = td.closest('tr');
    if (!tr) return { text: null, cls: '', left: null };
    const cells = Array.from(tr.children);
    const idx = cells.indexOf(td);
    let left = null;
    if (idx > 0) {
      const prev = cells[idx - 1];
      if (prev && ['td', 'th'].includes(prev.tagName.toLowerCase())) left = textOf(prev) || null;
    }
    const ths = tr.querySelectorAll('th');
    if (ths.length > 0) {
      return { text: textOf(ths[0]) || null, cls: (ths[0].getAttribute('class') || '').toLowerCase(), left };
    }
    if (idx > 0) {
      const prev = cells[idx - 1];
      if (prev && prev.tagName.toLowerCase() === 'td') {
        const t = textOf(prev);
        if (t && t.replace(/\s+/g, '').length >= 2) return { text: t, cls: '', left };
      }
    }
    let prevTr = tr.previousElementSibling;
    while (prevTr) {
      const prevThs = prevTr.querySelectorAll('th');
      if (prevThs.length > 0) {
        const pick = idx >= 0 && idx < prevThs.length ? prevThs[idx] : prevThs[0];
        return { text: textOf(pick) || null, cls: '', left };
      }
      prevTr = prevTr.previousElementSibling;
    }
    return { text: null, cls: '', left };
  };

  const nearRequiredMark = (el) => {
    const hasMark = (node) => {
      if (!node) return false;
      const txt = textOf(node);
      const cls = (node.getAttribute && (node.getAttribute('class') || '').toLowerCase()) || '';
      if (cls.includes('require') || cls.includes('must') || cls.includes('need') || cls.includes('mandatory') || cls.includes('required-mark')) return true;
      if (txt === '*' || txt === '＊' || txt.includes('必須')) return true;
      if (/※\s*必須/.test(txt)) return true;
      return false;
    };
    let p = el.parentElement; let depth = 0;
    while (p && depth < 2) {
      const spans = p.querySelectorAll('span, i, em, b, strong');
      for (const sp of spans) { if (hasMark(sp)) return true; }
      const imgs = p.querySelectorAll('img[alt]');
      for (const im of imgs) {
        const alt = (im.getAttribute('alt') || '').toLowerCase();
        if (alt.includes('必須') || alt.includes('required')) return true;
      }
      p = p.parentElement; depth++;
    }
    const id = el.getAttribute('id');
    if (id) {
      const labels = document.querySelectorAll('label[for="' + esc(id) + '"] span, label[for="' + esc(id) + '"] strong');
      for (const sp of labels) { if (hasMark(sp)) return true; }
    }
    const parent = el.parentElement;
    if (parent) {
      let sib = parent.previousElementSibling; let checked = 0;
      while (sib && checked < 3) {
        const txt = textOf(sib);
        if (txt && (txt.includes('必須') || /※\s*必須/.test(txt) || ['*', '＊'].includes(txt.trim()))) return true;
        sib = sib.previousElementSibling; checked++;
      }
    }
    return false;
  };

  const ancestorRequired = (el) => {
    const REQ = ['required', 'require', 'mandatory', 'must', 'necessary', '必須', 'wpcf7-validates-as-required'];
    const NEG = ['任意', 'optional'];
    const EXCL = ['captcha', 'image_auth', 'token', 'otp', 'verification', 'login', 'signin', 'auth', 'password'];
    let p = el.parentElement; let depth = 0;
    let hint = false, confirmed = false;
    while (p && depth < 6) {
      const cls = (p.getAttribute('class') || '').toLowerCase();
      if (REQ.some((t) => cls.includes(t))) {
        hint = true;
        if (depth < 3 && !EXCL.some((t) => cls.includes(t))) {
          const txt = textOf(p).toLowerCase();
          if (!NEG.some((t) => txt.includes(t))) confirmed = true;
        }
        break;
      }
      p = p.parentElement; depth++;
    }
    return { hint, confirmed };
  };

  const idTexts = (refs) => {
    const out = [];
    for (const ref of String(refs || '').split(/\s+/)) {
      if (!ref) continue;
      const n = document.getElementById(ref);
      if (n) {
        const t = textOf(n);
        if (t) out.push(t);
      }
    }
    return out;
  };

  const elements = [];
  const inputs = root.querySelectorAll('input, textarea, select');
  for (const el of inputs) {
    const tag = el.tagName.toLowerCase();
    const r = el.getBoundingClientRect();
    const dt = dtWalk(el);
    const th = thWalk(el);
    const anc = ancestorRequired(el);
    const nameAttr = el.getAttribute('name') || '';
    const parentLabel = el.closest('label');
    elements.push({
      tagName: tag,
      type: el.getAttribute('type') || '',
      name: nameAttr,
      id: el.getAttribute('id') || '',
      className: el.getAttribute('class') || '',
      placeholder: el.getAttribute('placeholder') || '',
      value: el.value || el.getAttribute('value') || '',
      visible: visibleLite(el),
      enabled: !el.disabled,
      requiredAttr: el.hasAttribute('required'),
      ariaRequired: el.getAttribute('aria-required') || '',
      style: el.getAttribute('style') || '',
      ariaHidden: el.getAttribute('aria-hidden') || '',
      tabindex: el.getAttribute('tabindex') || '',
      ariaLabelledby: el.getAttribute('aria-labelledby') || '',
      checked: !!el.checked,
      selectedIndex: tag === 'select' ? el.selectedIndex : -1,
      options: tag === 'select'
        ? Array.from(el.options).map((o) => ({ text: (o.textContent || '').trim(), value: o.value || '' }))
        : [],
      boundingBox: r.width || r.height ? { x: r.left, y: r.top, width: r.width, height: r.height } : null,
      selector: selectorFor(el),
      labelParentText: parentLabel ? (textOf(parentLabel).replace(el.value || '', '').trim() || null) : null,
      ariaLabelledTexts: idTexts(el.getAttribute('aria-labelledby')),
      ariaDescribedTexts: idTexts(el.getAttribute('aria-describedby')),
      liLabelText: liLabel(el),
      parentOwnText: parentOwnText(el),
      legendText: legendText(el),
      prevSiblings: siblingTexts(el, true, 3),
      nextSiblings: siblingTexts(el, false, 2),
      dtText: dt.text,
      thText: th.text,
      dtClass: dt.cls,
      thClass: th.cls,
      leftCellText: th.left,
      ancestorRequiredHint: anc.hint,
      ancestorRequiredConfirmed: anc.confirmed,
      nearRequiredMark: nearRequiredMark(el),
      nameRequiredMarker: ['必須', 'required', 'mandatory'].some((m) => nameAttr.includes(m))
    });
  }

  const labelFor = {};
  for (const l of document.querySelectorAll('label[for]')) {
    const k = l.getAttribute('for');
    const v = textOf(l);
    if (k && v) labelFor[k] = v;
  }

  const dtddIndex = [];
  for (const dl of document.querySelectorAll('dl')) {
    const children = Array.from(dl.children);
    for (let i = 0; i < children.length; i++) {
      const el = children[i];
      if (el.tagName.toLowerCase() !== 'dd') continue;
      let j = i - 1; let dtText = '';
      while (j >= 0) {
        if (children[j].tagName.toLowerCase() === 'dt') { dtText = textOf(children[j]); break; }
        j--;
      }
      const r = el.getBoundingClientRect();
      if (r.width === 0 || r.height === 0 || !inArea(r)) continue;
      dtddIndex.push({ x: r.left, y: r.top, width: r.width, height: r.height, text: dtText });
    }
  }

  const thtdIndex = [];
  for (const table of document.querySelectorAll('table')) {
    let colHeaders = [];
    const thead = table.querySelector('thead');
    if (thead) colHeaders = Array.from(thead.querySelectorAll('th')).map((th) => textOf(th));
    for (const tr of table.querySelectorAll('tr')) {
      const cells = Array.from(tr.children);
      let rowHeader = '';
      for (const c of cells) {
        if (c.tagName.toLowerCase() === 'th') rowHeader = textOf(c);
      }
      for (let ci = 0; ci < cells.length; ci++) {
        const c = cells[ci];
        if (c.tagName.toLowerCase() !== 'td') continue;
        const r = c.getBoundingClientRect();
        if (r.width === 0 || r.height === 0 || !inArea(r)) continue;
        let headerText = rowHeader;
        if (!headerText && colHeaders.length > ci) headerText = colHeaders[ci] || '';
        if (!headerText && ci > 0) {
          const prev = cells[ci - 1];
          if (prev && prev.tagName.toLowerCase() === 'td') headerText = textOf(prev);
        }
        thtdIndex.push({ x: r.left, y: r.top, width: r.width, height: r.height, text: headerText });
      }
    }
  }

  const textNodes = [];
  const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT, null, false);
  let node;
  while ((node = walker.nextNode())) {
    const text = (node.textContent || '').trim();
    if (!text || text.length < 2 || text.length > 200) continue;
    const parent = node.parentElement;
    if (!parent) continue;
    const tag = parent.tagName.toLowerCase();
    if (['input', 'textarea', 'select', 'script', 'style'].includes(tag)) continue;
    const r = parent.getBoundingClientRect();
    if (r.width === 0 || r.height === 0 || !inArea(r)) continue;
    textNodes.push({ text, tag, x: r.left, y: r.top, width: r.width, height: r.height });
  }

  return {
    url: location.href,
    formSelector: form ? selectorFor(form) : null,
    formBounds: formRect ? { x: formRect.left, y: formRect.top, width: formRect.width, height: formRect.height } : null,
    elements,
    labelFor,
    dtddIndex,
    thtdIndex,
    textNodes
  };
}
"#;

/// Scans submit/confirm button candidates.
///
/// Args: `{ "formSelector": string | null }` scopes the scan to the form.
pub const SCAN_BUTTONS: &str = r#"
(args) => {
  const esc = (s) => String(s).replace(/\\/g, '\\\\').replace(/"/g, '\\"');
  const root = args && args.formSelector ? (document.querySelector(args.formSelector) || document) : document;
  const textOf = (el) => ((el.innerText || el.textContent) || '').trim();
  const visibleLite = (el) => {
    const r = el.getBoundingClientRect();
    if (r.width === 0 || r.height === 0) return false;
    const st = window.getComputedStyle(el);
    return st.display !== 'none' && st.visibility !== 'hidden';
  };
  const selectorFor = (el) => {
    const id = el.getAttribute('id');
    if (id) return '[id="' + esc(id) + '"]';
    const tag = el.tagName.toLowerCase();
    const name = el.getAttribute('name');
    const type = el.getAttribute('type');
    if (name) {
      let sel = tag + '[name="' + esc(name) + '"]';
      if (tag === 'input' && type) sel += '[type="' + esc(type) + '"]';
      return sel;
    }
    const value = el.getAttribute('value');
    if (tag === 'input') {
      let sel = 'input[type="' + esc(type || 'submit') + '"]';
      if (value) sel += '[value*="' + esc(value.slice(0, 12)) + '"]';
      return sel;
    }
    return tag;
  };
  const out = [];
  const seen = new Set();
  const candidates = root.querySelectorAll(
    'button, input[type=submit], input[type=button], input[type=image], [role=button], a.btn, a.button'
  );
  for (const el of candidates) {
    const tag = el.tagName.toLowerCase();
    const value = el.getAttribute('value') || '';
    const aria = el.getAttribute('aria-label') || '';
    const text = [textOf(el), value, aria].filter(Boolean).join(' ').trim();
    const sel = selectorFor(el);
    const key = sel + '|' + text;
    if (seen.has(key)) continue;
    seen.add(key);
    const r = el.getBoundingClientRect();
    out.push({
      selector: sel,
      tagName: tag,
      type: el.getAttribute('type') || '',
      text,
      visible: visibleLite(el),
      enabled: !el.disabled,
      boundingBox: r.width || r.height ? { x: r.left, y: r.top, width: r.width, height: r.height } : null
    });
  }
  return out;
}
"#;

/// Scans consent checkbox candidates with label/context text.
///
/// Args: `{ "formSelector": string | null }`.
pub const SCAN_CONSENT: &str = r#"
(args) => {
  const esc = (s) => String(s).replace(/\\/g, '\\\\').replace(/"/g, '\\"');
  const form = args && args.formSelector ? document.querySelector(args.formSelector) : null;
  const root = form || document.body;
  const textOf = (el) => ((el.innerText || el.textContent) || '').trim();
  const selectorFor = (el) => {
    const id = el.getAttribute('id');
    if (id) return '[id="' + esc(id) + '"]';
    const name = el.getAttribute('name');
    if (name) return 'input[type="checkbox"][name="' + esc(name) + '"]';
    return 'input[type="checkbox"]';
  };
  const out = [];
  for (const el of root.querySelectorAll('input[type=checkbox], [role=checkbox]')) {
    const r = el.getBoundingClientRect();
    if (r.width === 0 || r.height === 0) continue;
    let labelSelector = null;
    let text = el.getAttribute('aria-label') || '';
    const id = el.getAttribute('id');
    if (id) {
      const lbl = document.querySelector('label[for="' + esc(id) + '"]');
      if (lbl) { labelSelector = 'label[for="' + esc(id) + '"]'; text += ' ' + textOf(lbl); }
    }
    const ancestorLabel = el.closest('label');
    if (ancestorLabel && !labelSelector) {
      text += ' ' + textOf(ancestorLabel);
    }
    if (text.trim().length < 6) {
      let cur = el.parentElement;
      while (cur && cur !== document.body) {
        const t = textOf(cur);
        if (t && t.length < 160) { text += ' ' + t; break; }
        cur = cur.parentElement;
      }
    }
    out.push({
      selector: selectorFor(el),
      labelSelector,
      text: text.trim().slice(0, 320),
      checked: !!el.checked,
      visible: true,
      boundingBox: { x: r.left, y: r.top, width: r.width, height: r.height },
      inForm: form ? form.contains(el) : false
    });
  }
  return out;
}
"#;

/// Arms the post-submit MutationObserver. Safe to call once per submission;
/// counters reset on every call.
pub const ARM_MUTATION_OBSERVER: &str = r#"
() => {
  if (window.__afObserver) { window.__afObserver.disconnect(); }
  window.__afMutationCount = 0;
  window.__afSignificantChanges = 0;
  const observer = new MutationObserver((mutations) => {
    window.__afMutationCount += mutations.length;
    for (const mutation of mutations) {
      if (mutation.type === 'childList' && mutation.addedNodes.length > 0) {
        for (const node of mutation.addedNodes) {
          if (node.nodeType === Node.ELEMENT_NODE) {
            const tagName = node.tagName ? node.tagName.toLowerCase() : '';
            if (['div', 'section', 'article', 'form', 'main'].includes(tagName)) {
              window.__afSignificantChanges++;
            }
          }
        }
      }
    }
  });
  observer.observe(document.body, { childList: true, subtree: true, attributes: true, attributeOldValue: true });
  window.__afObserver = observer;
  return true;
}
"#;

/// Reads the mutation counters.
pub const POLL_MUTATIONS: &str = r#"
() => ({
  mutations: window.__afMutationCount || 0,
  significant: window.__afSignificantChanges || 0
})
"#;

/// Tears the observer down.
pub const DISARM_MUTATION_OBSERVER: &str = r#"
() => {
  if (window.__afObserver) { window.__afObserver.disconnect(); window.__afObserver = null; }
  return true;
}
"#;

/// In-page click fallback for elements that refuse a native click.
///
/// Args: `{ "selector": string }`.
pub const CLICK_ELEMENT: &str = r#"
(args) => {
  const el = document.querySelector(args.selector);
  if (!el) return false;
  el.click();
  return true;
}
"#;

/// Captures the comparable page state used by the success judge.
///
/// Args: `{ "fieldSelectors": [string], "submitSelector": string | null }`.
pub const PAGE_STATE: &str = r#"
(args) => {
  const values = [];
  for (const sel of (args && args.fieldSelectors) || []) {
    const el = document.querySelector(sel);
    values.push({ selector: sel, value: el ? (el.value || '') : null, present: !!el });
  }
  let submitPresent = false;
  let submitDisabled = false;
  if (args && args.submitSelector) {
    const btn = document.querySelector(args.submitSelector);
    submitPresent = !!btn;
    submitDisabled = !!(btn && btn.disabled);
  }
  const visibleInputs = Array.from(document.querySelectorAll('input, textarea, select')).filter((el) => {
    const r = el.getBoundingClientRect();
    return r.width > 0 && r.height > 0;
  }).length;
  return {
    url: location.href,
    title: document.title,
    formCount: document.querySelectorAll('form').length,
    visibleInputs,
    fieldValues: values,
    submitPresent,
    submitDisabled
  };
}
"#;

/// Conservative allowlist check applied to every script constant.
pub fn validate_script(script: &str) -> Result<(), String> {
    const FORBIDDEN: &[&str] = &[
        "eval(",
        "Function(",
        "document.write",
        "fetch(",
        "document.cookie",
        "XMLHttpRequest",
    ];
    for token in FORBIDDEN {
        if script.contains(token) {
            return Err(format!("forbidden token in page script: {token}"));
        }
    }
    Ok(())
}

/// Every constant this module exposes, for validation sweeps.
pub fn all_scripts() -> [&'static str; 8] {
    [
        COLLECT_SNAPSHOT,
        SCAN_BUTTONS,
        SCAN_CONSENT,
        ARM_MUTATION_OBSERVER,
        POLL_MUTATIONS,
        DISARM_MUTATION_OBSERVER,
        CLICK_ELEMENT,
        PAGE_STATE,
    ]
}
