use crate::models::DisplayState;

pub fn render_index(display: &DisplayState) -> String {
    INDEX_HTML
        .replace("{{DATE}}", &display.date.to_string())
        .replace("{{CHANT}}", &escape(&display.chant))
        .replace("{{COUNT}}", &display.count.to_string())
        .replace("{{MALAS}}", &display.mala_count.to_string())
        .replace("{{TOTAL}}", &display.today_total.to_string())
        .replace("{{ELAPSED}}", &display.elapsed)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Namjaap</title>
  <style>
    :root {
      --bg: #f7f2e8;
      --ink: #2b2a28;
      --accent: #1976d2;
      --card: rgba(255, 255, 255, 0.9);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 24px 16px;
    }

    .app {
      width: min(560px, 100%);
      background: var(--card);
      border-radius: 24px;
      box-shadow: 0 20px 50px rgba(25, 118, 210, 0.15);
      padding: 28px;
      display: grid;
      gap: 20px;
      text-align: center;
    }

    select, button {
      font: inherit;
      padding: 10px 16px;
      border-radius: 12px;
      border: 1px solid #ccd;
    }

    #chant-button {
      width: 200px;
      height: 200px;
      margin: 0 auto;
      border-radius: 50%;
      border: none;
      background: var(--accent);
      color: white;
      font-size: 1.4rem;
      cursor: pointer;
    }

    .stats {
      display: grid;
      grid-template-columns: repeat(3, 1fr);
      gap: 12px;
    }

    .stats strong {
      display: block;
      font-size: 1.6rem;
    }

    .row {
      display: flex;
      gap: 12px;
      justify-content: center;
    }

    #status {
      min-height: 1.2em;
      color: #b00020;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Namjaap</h1>
      <div id="date">{{DATE}}</div>
    </header>

    <select id="chant-select"><option>{{CHANT}}</option></select>

    <div class="row">
      <div id="elapsed">{{ELAPSED}}</div>
      <button id="timer-toggle" type="button">Start / Pause</button>
      <button id="timer-reset" type="button">Reset</button>
    </div>

    <button id="chant-button" type="button">{{CHANT}}</button>

    <section class="stats">
      <div><strong id="count">{{COUNT}}</strong>Current</div>
      <div><strong id="malas">{{MALAS}}</strong>Malas today</div>
      <div><strong id="total">{{TOTAL}}</strong>Total today</div>
    </section>

    <div id="status"></div>
  </main>

  <script>
    const post = async (path, body) => {
      const res = await fetch(path, {
        method: 'POST',
        headers: body ? { 'Content-Type': 'application/json' } : {},
        body: body ? JSON.stringify(body) : undefined,
      });
      if (!res.ok) {
        throw new Error(await res.text());
      }
      return res.json();
    };

    const setStatus = (text) => {
      document.getElementById('status').textContent = text;
    };

    const updateUI = (state) => {
      document.getElementById('date').textContent = state.date;
      document.getElementById('count').textContent = state.count;
      document.getElementById('malas').textContent = state.malaCount;
      document.getElementById('total').textContent = state.todayTotal;
      document.getElementById('elapsed').textContent = state.elapsed;
      document.getElementById('chant-button').textContent = state.chant;
    };

    const loadChants = async () => {
      const chants = await (await fetch('/api/chants')).json();
      const select = document.getElementById('chant-select');
      select.innerHTML = '';
      [...chants.predefined, ...chants.custom].forEach((chant) => {
        const option = document.createElement('option');
        option.value = chant;
        option.textContent = chant;
        option.selected = chant === chants.active;
        select.appendChild(option);
      });
    };

    const refresh = async () => {
      updateUI(await (await fetch('/api/today')).json());
      const notes = await (await fetch('/api/notifications')).json();
      if (notes.length > 0) {
        setStatus(`Could not save: ${notes[notes.length - 1].message}`);
      }
    };

    const run = (action) => action().then(updateUI).catch((err) => setStatus(err.message));

    document.getElementById('chant-button').addEventListener('click', () => run(() => post('/api/increment')));
    document.getElementById('timer-toggle').addEventListener('click', () => run(() => post('/api/timer/toggle')));
    document.getElementById('timer-reset').addEventListener('click', () => run(() => post('/api/timer/reset')));
    document.getElementById('chant-select').addEventListener('change', (event) => {
      run(() => post('/api/chant', { chant: event.target.value }));
    });

    document.addEventListener('visibilitychange', () => {
      if (document.visibilityState === 'visible') {
        run(() => post('/api/visibility'));
      }
    });

    loadChants().catch((err) => setStatus(err.message));
    refresh().catch((err) => setStatus(err.message));
    setInterval(() => refresh().catch((err) => setStatus(err.message)), 1000);
  </script>
</body>
</html>
"#;
